//! B-tree test suite


mod invariant_tests;
