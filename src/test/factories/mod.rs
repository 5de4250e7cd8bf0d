//! Factories that assemble complete test inputs from the record helpers in [`crate::test`].

pub mod pe;
