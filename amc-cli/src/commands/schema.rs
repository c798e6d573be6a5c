use amc_service::models::{entity, EntityDescriptor, ENTITIES};
use anyhow::Result;
use colored::Colorize;

/// List the registered entity types, or describe one
pub fn execute(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => match entity(name) {
            Some(descriptor) => {
                describe(descriptor);
                Ok(())
            }
            None => {
                let known: Vec<_> = ENTITIES.iter().map(|e| e.name).collect();
                anyhow::bail!("Unknown entity: {}. Known: {}", name, known.join(", "))
            }
        },
        None => {
            for descriptor in ENTITIES {
                describe(descriptor);
                println!();
            }
            Ok(())
        }
    }
}

fn describe(descriptor: &EntityDescriptor) {
    println!("{}", descriptor.name.bold());
    println!("  table:       {}", descriptor.table);
    println!("  collection:  {}", descriptor.collection_path);
    println!("  member:      {}", descriptor.member_path("<id>"));
    println!("  unique:      {}", list(descriptor.unique_columns));
    println!("  relations:   {}", list(descriptor.relations));
}

fn list(items: &[&str]) -> String {
    if items.is_empty() {
        "-".dimmed().to_string()
    } else {
        items.join(", ")
    }
}
