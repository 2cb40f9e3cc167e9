// Integration-style tests that drive the router against mocked upstreams

pub mod common;
