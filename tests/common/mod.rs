#![allow(dead_code)]

pub mod fake_dhis2;

pub use fake_dhis2::{FakeDhis2, FakeOptions};
