//! Serializer test suite

mod value_tests;
