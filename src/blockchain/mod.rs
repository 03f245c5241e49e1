pub mod ethereum;
pub mod registry;
pub mod traits;

pub use ethereum::EthereumClient;
pub use registry::{Endpoint, EndpointRegistry};
pub use traits::{ChainProvider, TransactionStatus, TRANSFER_GAS_UNITS};
