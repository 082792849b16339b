pub mod endpoint_reader;
