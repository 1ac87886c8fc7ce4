// Export OpenAPI specification as JSON
//
// Usage: cargo run --bin export-openapi > docs/openapi.json

use promptgate_gateway::openapi::ApiDoc;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", ApiDoc::to_json()?);
    Ok(())
}
