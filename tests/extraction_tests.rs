//! Field extraction over catalog-shaped documents
use pc_power_catalog_lib::domain::component::RawComponentRow;
use pc_power_catalog_lib::domain::wattage::resolve_psus;
use pc_power_catalog_lib::infrastructure::parsing::{
    CPU_RULES, GPU_RULES, PSU_RULES, extract_best, extract_from_html, tables_matching,
};
use rstest::rstest;

const GPU_LISTING: &str = r#"
<html><body>
  <table class="filters"><tr><td>Manufacturer</td><td>Any</td></tr></table>
  <table class="results">
    <thead><tr><th>Model</th><th>Memory</th><th>Board Power</th></tr></thead>
    <tbody>
      <tr><td>GeForce RTX 4090</td><td>24 GB</td><td>450 W</td></tr>
      <tr><td>Radeon RX 7900 XTX</td><td>24 GB</td><td>355 W</td></tr>
      <tr><td>Arc A770</td><td>16 GB</td><td>-</td></tr>
    </tbody>
  </table>
</body></html>"#;

const PSU_RENDERED: &str = r#"
<table class="mytable">
  <tr><th>Brand</th><th>Product</th><th>Efficiency</th></tr>
  <tr><td>Corsair</td><td>Corsair RM750x</td><td>Gold</td></tr>
  <tr><td>EVGA</td><td>EVGA SuperNOVA G2</td><td>Gold</td></tr>
  <tr><td>Seasonic</td><td>Seasonic FOCUS GX-850</td><td>Gold</td></tr>
  <tr><td>Corsair</td><td>Corsair RM750x</td><td>Gold</td></tr>
</table>"#;

#[test]
fn best_table_is_selected_and_sentinels_dropped() {
    let extraction = extract_from_html(GPU_LISTING, &GPU_RULES);

    assert_eq!(
        extraction.rows,
        vec![
            RawComponentRow::new("GeForce RTX 4090", "450 W"),
            RawComponentRow::new("Radeon RX 7900 XTX", "355 W"),
        ]
    );
    assert_eq!(extraction.dropped, 1);
}

#[test]
fn headerless_table_uses_first_and_last_columns() {
    let html = r#"<table>
        <tr><td>Alpha</td><td>x</td><td>y</td></tr>
        <tr><td>Ryzen 5 5600X</td><td>6 cores</td><td>65 W</td></tr>
        <tr><td>Core i5-12400</td><td>6 cores</td><td>65 W</td></tr>
    </table>"#;

    let extraction = extract_from_html(html, &CPU_RULES);

    assert!(!extraction.is_empty());
    assert_eq!(extraction.rows[0], RawComponentRow::new("Ryzen 5 5600X", "65 W"));
}

#[test]
fn rendered_psu_table_resolves_from_names() {
    let tables = tables_matching(PSU_RENDERED, "table.mytable").unwrap();
    let extraction = extract_best(&tables, &PSU_RULES);
    assert_eq!(extraction.rows.len(), 4);

    let rows = pc_power_catalog_lib::domain::component::dedupe_by_name(extraction.rows);
    let (psus, dropped) = resolve_psus(rows);

    let resolved: Vec<(&str, u32)> = psus.iter().map(|p| (p.name.as_str(), p.wattage)).collect();
    assert_eq!(resolved, vec![("Corsair RM750x", 750), ("Seasonic FOCUS GX-850", 850)]);
    assert_eq!(dropped, 1);
}

#[rstest]
#[case("<p>nothing here</p>")]
#[case("")]
#[case("<table></table>")]
#[case("<table><tr><th>CPU</th><th>TDP</th></tr></table>")]
fn documents_without_rows_yield_nothing(#[case] html: &str) {
    assert!(extract_from_html(html, &CPU_RULES).is_empty());
}
