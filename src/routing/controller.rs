//! Controllers and endpoint declaration.
//!
//! A controller groups endpoints under a base path. Endpoints are declared
//! once per controller type through [`Controller::routes`]; the server then
//! instantiates the controller, binds every declared handler to that
//! instance and composes the final paths.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waypost::{Controller, DataResponse, EndpointRequest, HandlerResult, RouteError, Routes};
//!
//! struct PersonController;
//!
//! impl Controller for PersonController {
//!     fn path(&self) -> &str {
//!         "/person"
//!     }
//!
//!     fn routes(routes: &mut Routes<Self>) -> Result<(), RouteError> {
//!         routes.get("/:id", Self::get_person)?;
//!         Ok(())
//!     }
//! }
//!
//! impl PersonController {
//!     async fn get_person(self: Arc<Self>, req: EndpointRequest) -> HandlerResult<DataResponse> {
//!         Ok(DataResponse::ok().with_message(req.param("id").unwrap_or_default().to_string()))
//!     }
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::http::{EndpointRequest, EndpointResponse};
use crate::routing::endpoint::{handler_name, HandlerResult};
use crate::routing::path::{compose_path, to_router_syntax, validate_path};
use crate::routing::{Endpoint, HttpMethod, RouteError};

/// A group of endpoints sharing a base path.
pub trait Controller: Send + Sync + Sized + 'static {
    /// Base path; must start with `/`.
    fn path(&self) -> &str;

    /// Declare this controller's endpoints.
    fn routes(routes: &mut Routes<Self>) -> Result<(), RouteError>;
}

type ControllerHandler<C> = Arc<dyn Fn(Arc<C>, EndpointRequest) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

struct Declaration<C> {
    path: String,
    method: HttpMethod,
    name: String,
    handler: ControllerHandler<C>,
}

/// Endpoints declared for a controller type, not yet bound to an instance.
pub struct Routes<C> {
    declarations: Vec<Declaration<C>>,
}

macro_rules! method_declaration {
    ($fn_name:ident, $method:ident) => {
        #[doc = concat!("Declare a `", stringify!($method), "` endpoint relative to the controller path.")]
        pub fn $fn_name<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Self, RouteError>
        where
            F: Fn(Arc<C>, EndpointRequest) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = HandlerResult<R>> + Send + 'static,
            R: Into<EndpointResponse>,
        {
            self.endpoint(HttpMethod::$method, path, handler)
        }
    };
}

impl<C: Controller> Routes<C> {
    pub(crate) fn new() -> Self {
        Self { declarations: Vec::new() }
    }

    /// Declare an endpoint for `method` at `path`.
    pub fn endpoint<F, Fut, R>(&mut self, method: HttpMethod, path: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(Arc<C>, EndpointRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Into<EndpointResponse>,
    {
        validate_path(path)?;
        let name = handler_name::<F>();
        let handler: ControllerHandler<C> = Arc::new(
            move |controller: Arc<C>, request: EndpointRequest| -> BoxFuture<'static, HandlerResult> {
                let fut = handler(controller, request);
                Box::pin(async move { fut.await.map(Into::into) })
            },
        );
        self.declarations.push(Declaration { path: path.to_string(), method, name, handler });
        Ok(self)
    }

    method_declaration!(get, Get);
    method_declaration!(head, Head);
    method_declaration!(post, Post);
    method_declaration!(put, Put);
    method_declaration!(delete, Delete);
    method_declaration!(connect, Connect);
    method_declaration!(options, Options);
    method_declaration!(trace, Trace);
    method_declaration!(patch, Patch);

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Bind every declaration to `controller`, composing the final paths.
    fn bind(self, controller: Arc<C>) -> Vec<Endpoint> {
        let base = controller.path().to_string();
        self.declarations
            .into_iter()
            .map(|declaration| {
                let path = to_router_syntax(&compose_path(&base, &declaration.path));
                let controller = Arc::clone(&controller);
                let handler = declaration.handler;
                Endpoint::from_parts(
                    path,
                    declaration.method,
                    declaration.name,
                    Arc::new(move |request: EndpointRequest| handler(Arc::clone(&controller), request)),
                )
            })
            .collect()
    }
}

impl<C> fmt::Debug for Routes<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.declarations.iter().map(|d| (d.method, d.path.as_str(), d.name.as_str())))
            .finish()
    }
}

/// Validate a freshly built controller and collect its composed endpoints.
pub fn mount<C: Controller>(controller: C) -> Result<Vec<Endpoint>, RouteError> {
    validate_path(controller.path())?;
    let mut routes = Routes::new();
    C::routes(&mut routes)?;
    for declaration in &routes.declarations {
        validate_path(&compose_path(controller.path(), &declaration.path))?;
    }
    Ok(routes.bind(Arc::new(controller)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::DataResponse;

    struct PersonController {
        base: &'static str,
    }

    impl Controller for PersonController {
        fn path(&self) -> &str {
            self.base
        }

        fn routes(routes: &mut Routes<Self>) -> Result<(), RouteError> {
            routes.get("/:id", Self::get_person)?.delete("/:id/", Self::delete_person)?;
            Ok(())
        }
    }

    impl PersonController {
        async fn get_person(self: Arc<Self>, _req: EndpointRequest) -> HandlerResult<DataResponse> {
            Ok(DataResponse::ok())
        }

        async fn delete_person(self: Arc<Self>, _req: EndpointRequest) -> HandlerResult<DataResponse> {
            Ok(DataResponse::new(204))
        }
    }

    struct BrokenController;

    impl Controller for BrokenController {
        fn path(&self) -> &str {
            "/broken"
        }

        fn routes(routes: &mut Routes<Self>) -> Result<(), RouteError> {
            routes.post("no-slash", |_: Arc<Self>, _| async { Ok::<_, anyhow::Error>(DataResponse::ok()) })?;
            Ok(())
        }
    }

    #[test]
    fn test_mount_composes_paths() {
        let endpoints = mount(PersonController { base: "/person/" }).unwrap();
        let routes: Vec<_> = endpoints.iter().map(|e| (e.method(), e.path())).collect();
        assert_eq!(routes, [(HttpMethod::Get, "/person/{id}"), (HttpMethod::Delete, "/person/{id}")]);
        assert!(endpoints[0].answers_to("get_person"));
        assert!(endpoints[1].answers_to("PersonController::delete_person"));
    }

    #[test]
    fn test_controller_path_must_start_with_slash() {
        let err = mount(PersonController { base: "person" }).unwrap_err();
        assert_eq!(err, RouteError::InvalidRoutePath("person".into()));
    }

    #[test]
    fn test_catch_all_base_cannot_take_endpoints() {
        let err = mount(PersonController { base: "/files/*rest" }).unwrap_err();
        assert_eq!(err, RouteError::InvalidRoutePath("/files/*rest/:id".into()));
    }

    #[test]
    fn test_invalid_endpoint_declaration_aborts_mount() {
        let err = mount(BrokenController).unwrap_err();
        assert_eq!(err, RouteError::InvalidRoutePath("no-slash".into()));
    }
}
