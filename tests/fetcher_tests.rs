//! Source fetcher tiers against a local fixture catalog
use actix_web::{App, HttpResponse, HttpServer, web};
use pc_power_catalog_lib::domain::ComponentKind;
use pc_power_catalog_lib::infrastructure::config::{RenderConfig, SourceConfig};
use pc_power_catalog_lib::infrastructure::fetching::{FetchTier, SourceFetcher, SourceSpec};
use pc_power_catalog_lib::infrastructure::http_client::{HttpClient, HttpClientConfig};
use pc_power_catalog_lib::infrastructure::parsing::{CPU_RULES, GPU_RULES};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

type Query = web::Query<HashMap<String, String>>;

fn page_of(query: &Query) -> u32 {
    query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
}

/// Four pages of two CPUs each; page 3 is a server error
async fn static_search(query: Query) -> HttpResponse {
    let page = page_of(&query);
    if page == 3 {
        return HttpResponse::InternalServerError().finish();
    }
    if page > 4 {
        return HttpResponse::Ok().body("<html><body><p>No results</p></body></html>");
    }
    HttpResponse::Ok().content_type("text/html").body(format!(
        "<html><body><table>
           <thead><tr><th>#</th><th>Processor</th><th>TDP</th></tr></thead>
           <tbody>
             <tr><td>1</td><td>CPU {page}-a</td><td>65 W</td></tr>
             <tr><td>2</td><td>CPU {page}-b</td><td>N/A</td></tr>
             <tr><td>3</td><td>CPU {page}-c</td><td>105 W</td></tr>
           </tbody></table></body></html>"
    ))
}

async fn js_search() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html").body(
        "<html><head><script>
           window.addEventListener('load', () => fetch('/js/api/list?page=1&sort=name'));
         </script></head>
         <body><noscript>This site requires JavaScript</noscript></body></html>",
    )
}

async fn js_api(query: Query) -> HttpResponse {
    let page = page_of(&query);
    let items = if page <= 3 {
        json!([{ "id": page, "name": format!("GPU {page}"), "tdp": "200 W" }])
    } else {
        json!([])
    };
    HttpResponse::Ok().json(json!({ "items": items }))
}

async fn dead() -> HttpResponse {
    HttpResponse::NotFound().finish()
}

/// 503 on the first hit, then a table
async fn flaky(hits: web::Data<AtomicUsize>) -> HttpResponse {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        return HttpResponse::ServiceUnavailable().insert_header(("Retry-After", "0")).finish();
    }
    HttpResponse::Ok().body("<table><tr><th>Name</th><th>TDP</th></tr><tr><td>Ryzen 5 5600X</td><td>65 W</td></tr></table>")
}

fn start_fixture() -> (SocketAddr, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let data = web::Data::from(hits.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/static/search", web::get().to(static_search))
            .route("/js/search", web::get().to(js_search))
            .route("/js/api/list", web::get().to(js_api))
            .route("/dead/search", web::get().to(dead))
            .route("/flaky/search", web::get().to(flaky))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    (addr, hits)
}

fn client(max_retries: u32) -> HttpClient {
    HttpClient::new(HttpClientConfig {
        user_agent: "fixture-test".into(),
        timeout: Duration::from_secs(5),
        max_retries,
        backoff_base: Duration::from_millis(10),
        max_requests_per_second: 0,
    })
    .unwrap()
}

fn fetcher() -> SourceFetcher {
    let render = RenderConfig {
        enabled: false,
        ..Default::default()
    };
    SourceFetcher::new(client(0), 8, render)
}

fn source(addr: SocketAddr, path: &str, end_page: u32, kind: ComponentKind) -> SourceSpec {
    let rules = if kind == ComponentKind::Gpu { GPU_RULES } else { CPU_RULES };
    SourceSpec::new(
        kind,
        &SourceConfig {
            base_url: format!("http://{addr}{path}"),
            start_page: 1,
            end_page,
            query: [("sort".to_string(), "name".to_string())].into_iter().collect(),
            render_selector: "table".into(),
        },
        rules,
    )
}

#[actix_web::test]
async fn static_tier_survives_a_failed_page() {
    let (addr, _) = start_fixture();

    let report = fetcher()
        .fetch(&source(addr, "/static/search", 5, ComponentKind::Cpu))
        .await;

    assert_eq!(report.tier, Some(FetchTier::StaticHtml));
    assert_eq!(report.failed_pages, vec![3]);
    let names: Vec<&str> = report.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["CPU 1-a", "CPU 1-c", "CPU 2-a", "CPU 2-c", "CPU 4-a", "CPU 4-c"]);
    // one N/A row per good page
    assert_eq!(report.dropped, 3);
}

#[actix_web::test]
async fn js_gated_page_falls_back_to_discovered_api() {
    let (addr, _) = start_fixture();

    let report = fetcher()
        .fetch(&source(addr, "/js/search", 5, ComponentKind::Gpu))
        .await;

    assert_eq!(report.tier, Some(FetchTier::ApiDiscovery));
    let names: Vec<&str> = report.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["GPU 1", "GPU 2", "GPU 3"]);
    assert!(report.rows.iter().all(|r| r.consumption == "200 W"));
}

#[actix_web::test]
async fn exhausted_chain_is_a_soft_failure() {
    let (addr, _) = start_fixture();

    let report = fetcher()
        .fetch(&source(addr, "/dead/search", 3, ComponentKind::Cpu))
        .await;

    assert_eq!(report.tier, None);
    assert!(report.is_soft_failure());
}

#[actix_web::test]
async fn transient_status_is_retried() {
    let (addr, hits) = start_fixture();
    let url = Url::parse(&format!("http://{addr}/flaky/search")).unwrap();

    let body = client(2).fetch_text(&url).await.unwrap();

    assert!(body.contains("Ryzen 5 5600X"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[actix_web::test]
async fn retries_are_capped() {
    let (addr, hits) = start_fixture();
    let url = Url::parse(&format!("http://{addr}/flaky/search")).unwrap();

    // first hit fails and no retry is allowed
    let result = client(0).fetch(&url).await;

    assert!(result.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
