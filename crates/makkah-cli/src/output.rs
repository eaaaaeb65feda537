//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use makkah_api_models::{Blog, EventListing, Package, Product, Review, UserAccount};
use makkah_client::ShopView;
use makkah_session::Session;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

/// Rows that know how to print themselves as a table.
pub(crate) trait Tabular {
    fn header() -> String;
    fn row(&self) -> String;
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_list<T: Tabular + Serialize>(items: &[T], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(items)?,
        OutputFormat::Table => {
            println!("{}", T::header());
            for item in items {
                println!("{}", item.row());
            }
        }
    }
    Ok(())
}

pub(crate) fn render_package(package: &Package, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(package)?,
        OutputFormat::Table => {
            println!("id: {}", package.id.as_deref().unwrap_or("-"));
            println!("title: {}", package.title);
            println!("category: {}", package.category);
            println!("price: {}", format_price(package.price));
            println!("duration: {}", package.duration);
            if !package.region.is_empty() {
                println!("region: {}", package.region);
            }
            if !package.inclusions.is_empty() {
                println!("inclusions: {}", package.inclusions.join(", "));
            }
            if !package.description.is_empty() {
                println!();
                println!("{}", package.description);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_blog(blog: &Blog, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(blog)?,
        OutputFormat::Table => {
            println!("{}", blog.title);
            if !blog.author.is_empty() {
                println!("by {}", blog.author);
            }
            if let Some(date) = blog.date {
                println!("{}", date.format("%B %-d, %Y"));
            }
            if !blog.tags.is_empty() {
                println!("tags: {}", blog.tags.join(", "));
            }
            println!();
            println!("{}", blog.content);
        }
    }
    Ok(())
}

pub(crate) fn render_shop(shop: &ShopView, category: &str, format: OutputFormat) -> CliResult<()> {
    let products: Vec<Product> = shop.in_category(category).into_iter().cloned().collect();
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "categories": shop.categories,
            "products": products,
        }))?,
        OutputFormat::Table => {
            println!("categories: All, {}", shop.categories.join(", "));
            render_list(&products, format)?;
        }
    }
    Ok(())
}

pub(crate) fn render_session(session: &Session, format: OutputFormat) -> CliResult<()> {
    let role = session.role.map(|role| role.as_str());
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "signed_in": session.is_signed_in(),
            "identity": session.identity,
            "role": role,
        }))?,
        OutputFormat::Table => match &session.identity {
            Some(identity) => {
                println!("user: {}", identity.label());
                if let Some(name) = &identity.display_name {
                    println!("name: {name}");
                }
                println!("verified: {}", identity.email_verified);
                println!("role: {}", role.unwrap_or("unresolved"));
            }
            None => println!("signed out"),
        },
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_price(price: f64) -> String {
    format!("{price:.0} BDT")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

fn id_of(id: Option<&String>) -> &str {
    id.map_or("-", String::as_str)
}

impl Tabular for Package {
    fn header() -> String {
        format!("{:<26} {:<6} {:>14} {:<10} TITLE", "ID", "TYPE", "PRICE", "DURATION")
    }

    fn row(&self) -> String {
        format!(
            "{:<26} {:<6} {:>14} {:<10} {}",
            id_of(self.id.as_ref()),
            self.category.as_str(),
            format_price(self.price),
            truncate(&self.duration, 10),
            self.title
        )
    }
}

impl Tabular for Blog {
    fn header() -> String {
        format!("{:<26} {:<20} TITLE", "ID", "AUTHOR")
    }

    fn row(&self) -> String {
        format!(
            "{:<26} {:<20} {}",
            id_of(self.id.as_ref()),
            truncate(&self.author, 20),
            self.title
        )
    }
}

impl Tabular for Review {
    fn header() -> String {
        format!("{:<26} {:<6} {:<20} REVIEW", "ID", "STARS", "NAME")
    }

    fn row(&self) -> String {
        format!(
            "{:<26} {:<6} {:<20} {}",
            id_of(self.id.as_ref()),
            "*".repeat(usize::from(self.rating.min(5))),
            truncate(&self.name, 20),
            truncate(&self.review_text, 60)
        )
    }
}

impl Tabular for EventListing {
    fn header() -> String {
        format!("{:<26} {:<10} {:<10} {:<20} TITLE", "ID", "DATE", "STATUS", "LOCATION")
    }

    fn row(&self) -> String {
        let status = match self.status {
            makkah_api_models::EventStatus::Upcoming => "upcoming",
            makkah_api_models::EventStatus::Ongoing => "ongoing",
            makkah_api_models::EventStatus::Completed => "completed",
        };
        format!(
            "{:<26} {:<10} {:<10} {:<20} {}",
            id_of(self.id.as_ref()),
            self.date.format("%Y-%m-%d"),
            status,
            truncate(&self.location, 20),
            self.title
        )
    }
}

impl Tabular for Product {
    fn header() -> String {
        format!("{:<26} {:<14} {:>10} NAME", "ID", "CATEGORY", "PRICE")
    }

    fn row(&self) -> String {
        format!(
            "{:<26} {:<14} {:>10.2} {}",
            id_of(self.id.as_ref()),
            truncate(&self.category, 14),
            self.price,
            self.name
        )
    }
}

impl Tabular for UserAccount {
    fn header() -> String {
        format!("{:<26} {:<6} EMAIL", "ID", "ROLE")
    }

    fn row(&self) -> String {
        format!(
            "{:<26} {:<6} {}",
            id_of(self.id.as_ref()),
            self.role.as_str(),
            self.email
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use makkah_api_models::Role;

    #[test]
    fn long_cells_are_truncated() {
        assert_eq!(truncate("Aziziyah", 10), "Aziziyah");
        assert_eq!(truncate("Shifting tents in Mina", 8), "Shiftin…");
    }

    #[test]
    fn user_rows_show_role() {
        let account = UserAccount {
            id: Some("u1".into()),
            email: "staff@example.com".into(),
            role: Role::Admin,
        };
        let row = account.row();
        assert!(row.starts_with("u1"));
        assert!(row.contains("admin"));
        assert!(row.ends_with("staff@example.com"));
    }

    #[test]
    fn prices_render_whole_taka() {
        assert_eq!(format_price(1_150_000.0), "1150000 BDT");
    }
}
