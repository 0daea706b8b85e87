mod bridge_delivery;
mod config_file;
mod demo_flow;
