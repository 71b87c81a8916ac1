//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use waypost::{
    Controller, DataResponse, EndpointRequest, HandlerResult, RawResponse, ResponseStream, RouteError, Routes,
    Server, ServerBuilder,
};

/// Controller exercising every response shape.
#[derive(Debug, Default)]
pub struct PeopleController;

impl PeopleController {
    async fn get_person(self: Arc<Self>, req: EndpointRequest) -> HandlerResult<DataResponse> {
        Ok(DataResponse::ok().with_message("SUCCESS").with_content(json!({
            "id": req.param("id"),
            "name": "John Doe",
        })))
    }

    async fn create_person(self: Arc<Self>, req: EndpointRequest) -> HandlerResult<DataResponse> {
        let person: serde_json::Value = req.json()?;
        Ok(DataResponse::created().with_content(json!({"id": 7, "name": person["name"]})))
    }

    async fn boom(self: Arc<Self>, _req: EndpointRequest) -> HandlerResult<DataResponse> {
        anyhow::bail!("boom")
    }

    async fn card(self: Arc<Self>, req: EndpointRequest) -> HandlerResult<RawResponse> {
        let id = req.param("id").unwrap_or_default().to_string();
        Ok(RawResponse::new(move |stream: ResponseStream| async move {
            stream.set_header("content-type", "text/plain")?;
            stream.write(format!("Person #{}\n", id)).await?;
            stream.write("Name: John Doe\n").await?;
            Ok::<_, anyhow::Error>(())
        }))
    }

    async fn broken_card(self: Arc<Self>, _req: EndpointRequest) -> HandlerResult<RawResponse> {
        Ok(RawResponse::new(|_stream: ResponseStream| async move {
            Err::<(), _>(anyhow::anyhow!("card printer on fire"))
        }))
    }
}

impl Controller for PeopleController {
    fn path(&self) -> &str {
        "/person/"
    }

    fn routes(routes: &mut Routes<Self>) -> Result<(), RouteError> {
        routes.get("/:id", Self::get_person)?;
        routes.post("/", Self::create_person)?;
        routes.get("/:id/boom", Self::boom)?;
        routes.get("/:id/card", Self::card)?;
        routes.get("/:id/broken-card", Self::broken_card)?;
        Ok(())
    }
}

/// Builder bound to an ephemeral local port.
pub fn local_builder() -> ServerBuilder {
    Server::builder().hostname("127.0.0.1").port(0)
}

/// Build, listen and return the server with its base URL.
pub async fn start(builder: ServerBuilder) -> (Server, String) {
    let mut server = builder.build().unwrap();
    let addr: SocketAddr = server.listen().await.unwrap();
    (server, format!("http://{}", addr))
}
