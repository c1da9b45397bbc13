pub mod http_server;
pub mod routes;
pub mod websocket_server;
