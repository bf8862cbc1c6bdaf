mod common;
mod locale_routing_test;
