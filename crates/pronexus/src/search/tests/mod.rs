mod common;

mod orchestrator;
mod routing;
