//! # Seed Data Generator
//!
//! Creates a demo organization ready to issue documents.
//!
//! ## Usage
//! ```bash
//! # Default demo organization, owner "demo-owner"
//! cargo run -p factura-db --bin seed
//!
//! # Custom database and owner
//! cargo run -p factura-db --bin seed -- --db ./data/factura.db --owner user-123
//! ```
//!
//! ## What Gets Created
//! - One organization
//! - An `owner` membership for the given user id
//! - The default document types (B01, B02, B04, B14, B15, QUOTE)
//! - One active sequence per type: prefix `<CODE>-`, padding 8, starting at 1

use std::env;

use factura_core::{Role, SequenceConfig, DEFAULT_DOCUMENT_TYPES, DEFAULT_PADDING_LENGTH};
use factura_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./factura_dev.db");
    let mut org_name = String::from("Demo SRL");
    let mut owner = String::from("demo-owner");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--org" | "-o" => {
                if i + 1 < args.len() {
                    org_name = args[i + 1].clone();
                    i += 1;
                }
            }
            "--owner" | "-u" => {
                if i + 1 < args.len() {
                    owner = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FacturaSaaS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (default: ./factura_dev.db)");
                println!("  -o, --org <NAME>     Organization name (default: Demo SRL)");
                println!("  -u, --owner <ID>     Owner user id, the JWT `sub` (default: demo-owner)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 FacturaSaaS Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let organization = db.organizations().create(&org_name).await?;
    db.organizations()
        .upsert_member(&organization.id, &owner, Role::Owner)
        .await?;
    println!("✓ Organization '{}' ({})", organization.name, organization.id);
    println!("✓ Owner membership for '{}'", owner);

    println!();
    println!("Document types and sequences:");
    for template in DEFAULT_DOCUMENT_TYPES {
        let document_type = db
            .document_types()
            .insert(&organization.id, template.code, template.name, template.category)
            .await?;

        let config = SequenceConfig {
            prefix: format!("{}-", template.code),
            padding_length: DEFAULT_PADDING_LENGTH,
            ..SequenceConfig::default()
        };
        let sequence = db
            .sequences()
            .insert(&organization.id, &document_type.id, &config, Some(&owner))
            .await?;

        println!(
            "  {:<6} {:<22} next: {}",
            template.code,
            template.name,
            sequence.next_fiscal_number()
        );
    }

    println!();
    println!("✓ Seed complete!");
    println!("  Use header x-organization-id: {}", organization.id);

    Ok(())
}
