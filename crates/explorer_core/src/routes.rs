//! Standard sidebar routes of the map explorer and their partial endpoints.

use std::{fmt::Display, str::FromStr, sync::Arc};

use shared::domain::{ChangesetId, ElementId, ElementType, NoteId};
use url::form_urlencoded;

use crate::{
    config::Settings,
    controller::LoadRequest,
    error::RouteError,
    fetch_controller::{ContentReady, FetchController, Surfaces},
    pagination::{Pagination, PaginationOptions},
    router::Router,
    transport::{Method, Request, Transport},
};

/// Query parameters a route forwards to its endpoint, with their defaults.
type Forwarded = &'static [(&'static str, Option<&'static str>)];

/// Paginated list mounted inside the loaded content, if the request names one.
type NestedList = fn(&Settings, &LoadRequest) -> Option<PaginationOptions>;

struct RouteEntry {
    name: &'static str,
    pattern: &'static str,
    path: fn(&LoadRequest) -> String,
    forwarded: Forwarded,
    nested: Option<NestedList>,
}

/// Capture `name` in canonical form (`/changeset/007` asks for changeset 7).
/// Values that do not parse come out empty and fail at the endpoint.
fn group<T: FromStr + Display>(request: &LoadRequest, name: &str) -> String {
    request
        .group(name)
        .and_then(|raw| raw.parse::<T>().ok())
        .map(|value| value.to_string())
        .unwrap_or_default()
}

fn element_path(request: &LoadRequest) -> String {
    format!(
        "/{}/{}",
        group::<ElementType>(request, "type"),
        group::<ElementId>(request, "id")
    )
}

fn versions_of(settings: &Settings, request: &LoadRequest) -> Option<PaginationOptions> {
    let tags_diff = request.query_param("tags_diff").as_deref() == Some("true");
    Some(element_versions(
        settings,
        request.group("type")?.parse().ok()?,
        request.group("id")?.parse().ok()?,
        tags_diff,
    ))
}

fn changeset_comments_of(settings: &Settings, request: &LoadRequest) -> Option<PaginationOptions> {
    Some(changeset_comments(settings, request.group("id")?.parse().ok()?))
}

fn note_comments_of(settings: &Settings, request: &LoadRequest) -> Option<PaginationOptions> {
    Some(note_comments(settings, request.group("id")?.parse().ok()?))
}

const ROUTES: &[RouteEntry] = &[
    RouteEntry {
        name: "element-version",
        pattern: "/:type(node|way|relation)/:id(\\d+)/history/:version(\\d+)",
        path: |r| format!("{}/history/{}", element_path(r), group::<u64>(r, "version")),
        forwarded: &[],
        nested: None,
    },
    RouteEntry {
        name: "element-history",
        pattern: "/:type(node|way|relation)/:id(\\d+)/history",
        path: |r| format!("{}/history", element_path(r)),
        forwarded: &[("page", Some("1")), ("tags_diff", Some("false"))],
        nested: Some(versions_of),
    },
    RouteEntry {
        name: "element",
        pattern: "/:type(node|way|relation)/:id(\\d+)",
        path: element_path,
        forwarded: &[],
        nested: None,
    },
    RouteEntry {
        name: "changeset",
        pattern: "/changeset/:id(\\d+)",
        path: |r| format!("/changeset/{}", group::<ChangesetId>(r, "id")),
        forwarded: &[],
        nested: Some(changeset_comments_of),
    },
    RouteEntry {
        name: "note",
        pattern: "/note/:id(\\d+)",
        path: |r| format!("/note/{}", group::<NoteId>(r, "id")),
        forwarded: &[],
        nested: Some(note_comments_of),
    },
    RouteEntry {
        name: "where-is-this",
        pattern: "/search/where-is-this",
        path: |_| "/where-is-this".to_string(),
        forwarded: &[("lon", None), ("lat", None), ("zoom", None)],
        nested: None,
    },
    RouteEntry {
        name: "search",
        pattern: "/search",
        path: |_| "/search".to_string(),
        forwarded: &[("q", None), ("bbox", None), ("local_only", None)],
        nested: None,
    },
    RouteEntry {
        name: "query-features",
        pattern: "/query",
        path: |_| "/query".to_string(),
        forwarded: &[("lat", None), ("lon", None)],
        nested: None,
    },
];

/// Builds `{prefix}{path}` plus the forwarded query parameters. Parameters
/// without a value and without a default are left out.
fn endpoint_url(prefix: &str, path: &str, forwarded: Forwarded, request: &LoadRequest) -> String {
    let pairs = request.query_pairs();
    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (name, default) in forwarded {
        let value = pairs
            .iter()
            .find_map(|(key, value)| (key == name).then(|| value.clone()))
            .or_else(|| default.map(str::to_string));
        if let Some(value) = value {
            query.append_pair(name, &value);
            any = true;
        }
    }
    let query = query.finish();
    if any {
        format!("{prefix}{path}?{query}")
    } else {
        format!("{prefix}{path}")
    }
}

/// Highlights the payload geometry of structured responses.
pub fn highlight_payload(ready: &ContentReady<'_>) {
    if let Some(payload) = ready.content.payload() {
        if !payload.render.is_empty() {
            ready.surfaces.focus.focus(&payload.render);
        }
    }
}

fn mount_nested(settings: &Settings, nested: NestedList, ready: &mut ContentReady<'_>) {
    let Some(container) = ready.surfaces.list.clone() else {
        return;
    };
    let Some(options) = nested(settings, ready.request) else {
        return;
    };
    let pagination = Pagination::configure(container, Arc::clone(ready.transport), options);
    ready.attach(pagination);
}

/// Router with every standard sidebar route registered, in match order.
pub fn standard_router(
    settings: &Settings,
    transport: Arc<dyn Transport>,
    surfaces: Surfaces,
) -> Result<Router, RouteError> {
    let mut router = Router::new();
    for entry in ROUTES {
        let prefix = settings.partial_prefix.clone();
        let path = entry.path;
        let forwarded = entry.forwarded;
        let list_settings = settings.clone();
        let nested = entry.nested;
        let controller = FetchController::new(
            entry.name,
            Arc::clone(&transport),
            surfaces.clone(),
            move |request| endpoint_url(&prefix, &path(request), forwarded, request),
            move |mut ready| {
                highlight_payload(&ready);
                if let Some(nested) = nested {
                    mount_nested(&list_settings, nested, &mut ready);
                }
            },
        );
        router.register(entry.pattern, controller)?;
    }
    Ok(router)
}

/// Pagination of a JSON list nested in sidebar content, served from
/// `{prefix}{path}` with `page`/`cursor`, filters and `page_size` as query.
fn nested_list(settings: &Settings, path: String, page_size: u32) -> PaginationOptions {
    let url = format!("{}{path}", settings.partial_prefix);
    PaginationOptions::new(move |page| {
        let mut fields = page.query_pairs();
        fields.push(("page_size".to_string(), page.page_size.to_string()));
        Request::new(Method::Get, url.clone(), fields)
    })
    .with_page_size(page_size)
    .with_window_distance(settings.page_window_distance)
}

/// Discussion comments below a changeset.
pub fn changeset_comments(settings: &Settings, id: ChangesetId) -> PaginationOptions {
    nested_list(
        settings,
        format!("/changeset/{id}/comments"),
        settings.comments_page_size,
    )
}

/// Comments of a note.
pub fn note_comments(settings: &Settings, id: NoteId) -> PaginationOptions {
    nested_list(settings, format!("/note/{id}/comments"), settings.comments_page_size)
}

/// Version list of an element, optionally with tag diffs between versions.
pub fn element_versions(
    settings: &Settings,
    kind: ElementType,
    id: ElementId,
    tags_diff: bool,
) -> PaginationOptions {
    nested_list(
        settings,
        format!("/{kind}/{id}/versions"),
        settings.history_page_size,
    )
    .with_filter("tags_diff", tags_diff.to_string())
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;
