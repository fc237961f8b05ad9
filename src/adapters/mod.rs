pub mod api_server;
pub mod multicall_rpc;
pub mod postgres;
pub mod subgraph;

pub use api_server::start_api_server;
pub use multicall_rpc::AlloyMulticall;
pub use postgres::PostgresStore;
pub use subgraph::SubgraphClient;
