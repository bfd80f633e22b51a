#![allow(missing_docs)]

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pc_power_catalog_lib::run().await
}
