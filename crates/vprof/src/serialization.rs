pub mod profile;
pub mod serializer;
