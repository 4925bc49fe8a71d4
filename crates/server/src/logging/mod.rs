pub mod flow_event;

pub use flow_event::FlowEvent;
