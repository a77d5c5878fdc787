use super::*;
use crate::{
    controller::{Controller, ControllerState},
    pagination::{PageContainer, Pagination},
    render::{FocusLayer, MemoryFocusLayer, MemoryPager, MemoryTarget, RenderTarget},
    router::MatchGroups,
    test_support::ScriptedTransport,
    transport::{Method, Request},
};
use serde_json::json;

struct Fixture {
    transport: Arc<ScriptedTransport>,
    sidebar: Arc<MemoryTarget>,
    focus: Arc<MemoryFocusLayer>,
    router: Router,
}

fn fixture() -> Fixture {
    let transport = ScriptedTransport::new();
    let sidebar = Arc::new(MemoryTarget::new());
    let focus = Arc::new(MemoryFocusLayer::new());
    let router = standard_router(
        &Settings::default(),
        transport.clone(),
        Surfaces::new(sidebar.clone(), focus.clone()),
    )
    .expect("router");
    Fixture {
        transport,
        sidebar,
        focus,
        router,
    }
}

#[tokio::test]
async fn changeset_dispatch_issues_exactly_one_partial_fetch() {
    let mut f = fixture();

    let dispatch = f.router.dispatch("/changeset/4521").await;

    assert_eq!(dispatch.route.as_deref(), Some("changeset"));
    assert_eq!(dispatch.groups, MatchGroups::from_iter([("id", "4521")]));
    let active = f.router.active().expect("active controller").clone();
    assert_eq!(active.state(), ControllerState::Loading);

    let pending = f.transport.next_request().await;
    assert_eq!(pending.request, Request::get("/api/partial/changeset/4521"));
    assert_eq!(f.transport.requests().len(), 1);
    assert!(pending.respond_html("<h2>Changeset: 4521</h2>"));
    active.settled().await;
    assert_eq!(f.sidebar.html(), "<h2>Changeset: 4521</h2>");
}

#[tokio::test]
async fn element_routes_map_to_their_endpoints() {
    let mut f = fixture();

    for (url, route, endpoint) in [
        ("/way/123", "element", "/api/partial/way/123"),
        ("/node/5/history/2", "element-version", "/api/partial/node/5/history/2"),
        (
            "/relation/9/history",
            "element-history",
            "/api/partial/relation/9/history?page=1&tags_diff=false",
        ),
        (
            "/relation/9/history?page=3&tags_diff=true#map=3/0/0",
            "element-history",
            "/api/partial/relation/9/history?page=3&tags_diff=true",
        ),
        ("/note/77", "note", "/api/partial/note/77"),
        ("/changeset/0042", "changeset", "/api/partial/changeset/42"),
        (
            "/search?q=main%20st&bbox=1,2,3,4",
            "search",
            "/api/partial/search?q=main+st&bbox=1%2C2%2C3%2C4",
        ),
        (
            "/search/where-is-this?lat=52.2&lon=21.0&zoom=17",
            "where-is-this",
            "/api/partial/where-is-this?lon=21.0&lat=52.2&zoom=17",
        ),
        ("/query?lat=1&lon=2", "query-features", "/api/partial/query?lat=1&lon=2"),
    ] {
        let dispatch = f.router.dispatch(url).await;
        assert_eq!(dispatch.route.as_deref(), Some(route), "{url}");
        let pending = f.transport.next_request().await;
        assert_eq!(pending.request.url, endpoint, "{url}");
        assert!(pending.respond_html("<p>ok</p>"));
        f.router.active().expect("active").settled().await;
    }
}

#[tokio::test]
async fn paging_history_reuses_the_controller_without_unloading() {
    let mut f = fixture();

    f.router.dispatch("/node/1/history?page=1").await;
    assert!(f.transport.next_request().await.respond_html("<p>page 1</p>"));
    f.router.active().expect("active").settled().await;

    let second = f.router.dispatch("/node/1/history?page=2").await;
    assert!(!second.changed);
    // Previous content stays visible until the next page arrives.
    assert_eq!(f.sidebar.html(), "<p>page 1</p>");

    assert!(f.transport.next_request().await.respond_html("<p>page 2</p>"));
    f.router.active().expect("active").settled().await;
    assert_eq!(f.sidebar.html(), "<p>page 2</p>");
}

#[tokio::test]
async fn structured_payload_is_highlighted_and_cleared_on_switch() {
    let mut f = fixture();

    f.router.dispatch("/way/10").await;
    assert!(f.transport.next_request().await.respond_json(
        200,
        json!({
            "html": "<h2>Way 10</h2>",
            "render": { "lines": [{ "line": "_p~iF~ps|U_ulLnnqC" }] }
        }),
    ));
    f.router.active().expect("active").settled().await;
    assert_eq!(f.focus.current().map(|data| data.lines.len()), Some(1));

    let dispatch = f.router.dispatch("/#map=4/0/0").await;
    assert_eq!(dispatch.route, None);
    assert_eq!(f.focus.current(), None);
    assert_eq!(f.sidebar.html(), "");
    assert_eq!(f.transport.requests().len(), 1);
}

#[tokio::test]
async fn rapid_navigation_only_renders_the_last_destination() {
    let mut f = fixture();

    f.router.dispatch("/changeset/1").await;
    let first = f.transport.next_request().await;
    f.router.dispatch("/note/2").await;
    let second = f.transport.next_request().await;

    assert!(second.respond_html("<p>note 2</p>"));
    f.router.active().expect("active").settled().await;
    let _ = first.respond_html("<p>changeset 1</p>");
    tokio::task::yield_now().await;

    assert_eq!(f.sidebar.html(), "<p>note 2</p>");
    assert_eq!(f.router.active().map(|c| c.name().to_string()).as_deref(), Some("note"));
}

#[tokio::test]
async fn nested_lists_use_configured_page_sizes() {
    let settings = Settings {
        comments_page_size: 5,
        ..Settings::default()
    };
    let transport = ScriptedTransport::new();
    let items = Arc::new(MemoryTarget::new());
    let container = PageContainer {
        items: items.clone(),
        pager: Arc::new(MemoryPager::new()),
    };

    let comments = Pagination::configure(
        container.clone(),
        transport.clone(),
        changeset_comments(&settings, ChangesetId(7)),
    );
    let pending = transport.next_request().await;
    assert_eq!(
        pending.request,
        Request::new(
            Method::Get,
            "/api/partial/changeset/7/comments",
            vec![
                ("page".into(), "1".into()),
                ("page_size".into(), "5".into())
            ],
        )
    );
    assert!(pending.respond_json(
        200,
        json!({"items": ["<li>first</li>"], "page": 1, "num_pages": 1})
    ));
    comments.settled().await;
    assert_eq!(items.html(), "<li>first</li>");
    comments.unmount();

    let versions = Pagination::configure(
        container,
        transport.clone(),
        element_versions(&settings, ElementType::Way, ElementId(12), true),
    );
    let pending = transport.next_request().await;
    assert_eq!(pending.request.url, "/api/partial/way/12/versions");
    assert_eq!(
        pending.request.fields,
        vec![
            ("page".to_string(), "1".to_string()),
            ("tags_diff".to_string(), "true".to_string()),
            ("page_size".to_string(), "10".to_string()),
        ]
    );
    versions.unmount();
}

#[tokio::test]
async fn changeset_content_mounts_its_comments_until_navigation_leaves() {
    let transport = ScriptedTransport::new();
    let sidebar = Arc::new(MemoryTarget::new());
    let comments = Arc::new(MemoryTarget::new());
    let surfaces = Surfaces::new(sidebar.clone(), Arc::new(MemoryFocusLayer::new())).with_list(
        PageContainer {
            items: comments.clone(),
            pager: Arc::new(MemoryPager::new()),
        },
    );
    let mut router =
        standard_router(&Settings::default(), transport.clone(), surfaces).expect("router");

    router.dispatch("/changeset/4521").await;
    assert!(transport.next_request().await.respond_html("<h2>Changeset 4521</h2>"));
    router.active().expect("active").settled().await;

    let pending = transport.next_request().await;
    assert_eq!(
        pending.request,
        Request::new(
            Method::Get,
            "/api/partial/changeset/4521/comments",
            vec![
                ("page".into(), "1".into()),
                ("page_size".into(), "15".into())
            ],
        )
    );

    router.dispatch("/way/5").await;
    let _ = pending.respond_json(200, json!({"items": ["<li>late</li>"], "num_pages": 1}));
    let element = transport.next_request().await;
    assert_eq!(element.request.url, "/api/partial/way/5");
    assert!(element.respond_html("<h2>Way 5</h2>"));
    router.active().expect("active").settled().await;

    assert_eq!(sidebar.html(), "<h2>Way 5</h2>");
    assert_eq!(comments.html(), "");
    assert_eq!(transport.pending_count(), 0);
}
