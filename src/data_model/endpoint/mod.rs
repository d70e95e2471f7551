pub mod root_endpoint;
