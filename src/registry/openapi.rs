//! OpenAPI rendering of the discovery document.

use std::collections::BTreeMap;

use utoipa::openapi::path::{Operation, OperationBuilder, PathItem};
use utoipa::openapi::{InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, ResponseBuilder};

use super::AggregatedDocument;
use crate::endpoint::HttpMethod;

/// Convert router path syntax (`/items/:id`, `/files/*rest`) to OpenAPI
/// templates (`/items/{id}`, `/files/{rest}`).
pub fn openapi_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':').or_else(|| segment.strip_prefix('*')) {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn operation_id(method: HttpMethod, path: &str) -> String {
    let slug: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}{}", method.to_string().to_lowercase(), slug.trim_end_matches('_'))
}

fn set_operation(item: &mut PathItem, method: HttpMethod, operation: Operation) {
    let slot = match method {
        HttpMethod::Get => &mut item.get,
        HttpMethod::Post => &mut item.post,
        HttpMethod::Put => &mut item.put,
        HttpMethod::Patch => &mut item.patch,
        HttpMethod::Delete => &mut item.delete,
        HttpMethod::Head => &mut item.head,
        HttpMethod::Options => &mut item.options,
        HttpMethod::Any => return,
    };
    *slot = Some(operation);
}

/// Build an OpenAPI document listing every aggregated endpoint.
///
/// Groups become tags; `ANY` expands to every concrete verb.
pub fn build_openapi(doc: &AggregatedDocument) -> OpenApi {
    let mut items: BTreeMap<String, PathItem> = BTreeMap::new();

    for descriptor in &doc.endpoints {
        let path = openapi_path(&descriptor.path);
        let item = items.entry(path).or_default();

        for method in descriptor.method.expand() {
            let operation = OperationBuilder::new()
                .operation_id(Some(operation_id(method, &descriptor.path)))
                .summary(Some(descriptor.description.clone()))
                .description(
                    descriptor
                        .version
                        .as_ref()
                        .map(|v| format!("Endpoint version {v}")),
                )
                .tag(descriptor.group.clone())
                .response(
                    "200",
                    ResponseBuilder::new()
                        .description("Successful response")
                        .build(),
                )
                .build();
            set_operation(item, method, operation);
        }
    }

    let paths = items
        .into_iter()
        .fold(PathsBuilder::new(), |paths, (path, item)| paths.path(path, item))
        .build();

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(doc.name.clone())
                .version(doc.version.clone())
                .build(),
        )
        .paths(paths)
        .build()
}
