pub mod books;
pub mod borrow;
pub mod summary;
