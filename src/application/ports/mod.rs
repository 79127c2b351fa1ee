pub mod inbound;
pub mod outbound;
pub mod storage_ports;
pub mod trash_ports;
