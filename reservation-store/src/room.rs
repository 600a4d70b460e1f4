pub mod key;
pub mod model;
pub(crate) mod record;
