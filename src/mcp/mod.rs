mod dispatcher;
pub mod protocol;
pub mod tools;

pub use dispatcher::Dispatcher;
pub use protocol::{error_codes, JsonRpcRequest, JsonRpcResponse};
