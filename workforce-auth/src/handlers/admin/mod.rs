pub mod companies;

pub use companies::list_companies;
