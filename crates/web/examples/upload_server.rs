use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use micro_gate::config::PolicyConfig;
use micro_gate::{DestinationDescriptor, DestinationOverride, PolicyStore};
use micro_gate_web::router::{Router, get, post, put};
use micro_gate_web::{HandlerError, Server, handler_fn};

async fn accept(request: Request<Bytes>) -> Result<Response<Bytes>, HandlerError> {
    let route = request.extensions().get::<Arc<DestinationDescriptor>>().map(|d| d.route().to_owned()).unwrap_or_default();
    Ok(Response::new(Bytes::from(format!("{route}: received {} bytes\n", request.body().len()))))
}

#[tokio::main]
async fn main() {
    let router = Router::builder()
        .route("/", get())
        .route("/api/data", post())
        .route("/upload", post().limit_override(DestinationOverride::Limit(10 * 1024 * 1024)))
        .route("/files/{name}", put().declared_cap(64 * 1024))
        .route("/firehose", post().limit_override(DestinationOverride::Disabled))
        .build()
        .unwrap();

    // 1 MiB for known routes, 1 KiB for anything else
    let config = PolicyConfig::from_json(r#"{"recognized": 1048576, "unrecognized": 1024}"#).unwrap();
    let policy = PolicyStore::builder().config(config).build().unwrap();

    Server::builder()
        .address("127.0.0.1:3000")
        .router(router)
        .policy(policy)
        .handler(handler_fn(accept))
        .build()
        .unwrap()
        .start()
        .await;
}
