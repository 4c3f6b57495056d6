//! Sample workflows served by `stagehand serve` and used in tests.
//!
//! Tool handlers are stubs returning fixed text.

use crate::error::StagehandError;
use crate::stage::Stage;
use crate::tools::{StageTool, ToolOutput, ToolParameters};
use crate::workflow::{Workflow, WorkflowRegistry};

/// Both demo workflows, advertised at `base_url`.
pub fn registry(base_url: &str) -> Result<WorkflowRegistry, StagehandError> {
    WorkflowRegistry::new(base_url)
        .register(zillow()?)?
        .register(travel()?)
}

/// Real-estate investing: search, underwriting, portfolio.
pub fn zillow() -> Result<Workflow, StagehandError> {
    Workflow::builder("zillow")
        .description(
            "Real estate investing: search properties, underwrite deals, and manage a rental portfolio",
        )
        .stage(search_stage())
        .stage(underwriting_stage())
        .stage(portfolio_stage())
        .build()
}

fn search_stage() -> Stage {
    Stage::builder("search")
        .description("Find investment properties matching the investor's criteria")
        .tool(StageTool::sync(
            "search_properties",
            "Search listings in a location, optionally capped at a price",
            ToolParameters::object()
                .string("location", "City or zip code", true)
                .number("max_price", "Maximum list price in USD", false)
                .build(),
            |_, args| {
                let location = args.get_str("location")?;
                Ok(ToolOutput::text(format!(
                    "Found 3 properties in {location}: A (3bd duplex, $410k), B (4bd SFH, $465k), C (2bd condo, $298k)"
                ))
                .with_state("location", location))
            },
        ))
        .tool(StageTool::sync(
            "save_property",
            "Add a property to the shortlist",
            ToolParameters::object()
                .string("property_id", "Property identifier", true)
                .build(),
            |ctx, args| {
                let id = args.get_str("property_id")?;
                let mut shortlist: Vec<serde_json::Value> = ctx
                    .get_state("shortlist")
                    .and_then(|v| v.as_array().cloned())
                    .unwrap_or_default();
                shortlist.push(id.into());
                let count = shortlist.len();
                Ok(ToolOutput::text(format!("Saved property {id}. Shortlist has {count} properties"))
                    .with_state("shortlist", shortlist))
            },
        ))
        .transition("underwriting")
        .transition("portfolio")
        .build()
}

fn underwriting_stage() -> Stage {
    Stage::builder("underwriting")
        .description("Run the numbers on shortlisted properties")
        .prerequisite("search")
        .tool(StageTool::sync(
            "estimate_cash_flow",
            "Estimate monthly cash flow for a property",
            ToolParameters::object()
                .string("property_id", "Property identifier", true)
                .number("down_payment_pct", "Down payment as a percentage", false)
                .build(),
            |_, args| {
                let id = args.get_str("property_id")?;
                let down = args.get_f64("down_payment_pct").unwrap_or(25.0);
                Ok(ToolOutput::text(format!(
                    "Property {id} at {down}% down: rent $2350, PITI $1890, reserves $180. Cash flow +$280/mo, cap rate 6.1%"
                )))
            },
        ))
        .tool(StageTool::sync(
            "order_inspection",
            "Order a property inspection",
            ToolParameters::object()
                .string("property_id", "Property identifier", true)
                .build(),
            |_, args| {
                let id = args.get_str("property_id")?;
                Ok(ToolOutput::text(format!("Inspection ordered for property {id}. Report in 3 business days"))
                    .with_state("inspection", id))
            },
        ))
        .transition("search")
        .transition("portfolio")
        .build()
}

fn portfolio_stage() -> Stage {
    let property_id = || {
        ToolParameters::object()
            .string("property_id", "Property identifier", true)
            .build()
    };

    Stage::builder("portfolio")
        .description("Portfolio management: monitoring, tax optimization, rebalancing")
        .prerequisite("underwriting")
        .tool(StageTool::sync(
            "monitor_property_values",
            "Monitor property values from 6 AVM sources",
            ToolParameters::empty(),
            |_, _| {
                Ok(ToolOutput::text(
                    "Values updated: 3 properties up 4-7%, 1 flat, 1 down 2% (market correction)",
                ))
            },
        ))
        .tool(StageTool::sync(
            "track_rent_comps",
            "Track competitive rent pricing",
            property_id(),
            |_, args| {
                let id = args.get_str("property_id")?;
                Ok(ToolOutput::text(format!(
                    "Property {id}: Current rent $2100, market $2350. Recommend $200 increase"
                )))
            },
        ))
        .tool(StageTool::sync(
            "detect_refi_opportunities",
            "Detect refinance opportunities from rate changes",
            ToolParameters::empty(),
            |_, _| {
                Ok(ToolOutput::text(
                    "Refi opportunity: Property B - rates dropped 0.6%. Save $180/mo, $65k over life",
                ))
            },
        ))
        .tool(StageTool::sync(
            "run_cost_segregation",
            "Run cost segregation study for tax benefits",
            property_id(),
            |_, args| {
                let id = args.get_str("property_id")?;
                Ok(ToolOutput::text(format!(
                    "Cost seg for property {id}: Accelerate $85k depreciation. Tax savings: $21k in year 1"
                )))
            },
        ))
        .tool(StageTool::sync(
            "simulate_rebalance",
            "Simulate portfolio rebalancing with tax implications",
            ToolParameters::object()
                .object("constraints", "Rebalancing constraints", true)
                .build(),
            |_, _| {
                Ok(ToolOutput::text(
                    "Rebalance: Sell prop C (underperforming), 1031 into 2 properties. +$142k NPV",
                ))
            },
        ))
        .build()
}

/// Trip planning: plan, then book.
pub fn travel() -> Result<Workflow, StagehandError> {
    Workflow::builder("travel")
        .description("Travel planning: search flights and hotels, then book a trip")
        .stage(
            Stage::builder("plan")
                .description("Compare flights and hotels")
                .tool(StageTool::sync(
                    "find_flights",
                    "Search flights between two cities",
                    ToolParameters::object()
                        .string("origin", "Departure city", true)
                        .string("destination", "Arrival city", true)
                        .build(),
                    |_, args| {
                        let origin = args.get_str("origin")?;
                        let destination = args.get_str("destination")?;
                        Ok(ToolOutput::text(format!(
                            "Flights {origin} to {destination}: F1 nonstop $320, F2 one-stop $245"
                        ))
                        .with_state("route", format!("{origin}-{destination}")))
                    },
                ))
                .tool(StageTool::sync(
                    "find_hotels",
                    "Search hotels in a city",
                    ToolParameters::object()
                        .string("city", "City", true)
                        .build(),
                    |_, args| {
                        let city = args.get_str("city")?;
                        Ok(ToolOutput::text(format!(
                            "Hotels in {city}: H1 downtown $189/night, H2 airport $129/night"
                        )))
                    },
                ))
                .transition("book")
                .build(),
        )
        .stage(
            Stage::builder("book")
                .description("Confirm and pay for the selected itinerary")
                .prerequisite("plan")
                .tool(StageTool::sync(
                    "book_trip",
                    "Book a flight and hotel together",
                    ToolParameters::object()
                        .string("flight_id", "Flight identifier", true)
                        .string("hotel_id", "Hotel identifier", true)
                        .build(),
                    |_, args| {
                        let flight = args.get_str("flight_id")?;
                        let hotel = args.get_str("hotel_id")?;
                        Ok(ToolOutput::text(format!(
                            "Booked flight {flight} and hotel {hotel}. Confirmation TRV-20931"
                        ))
                        .with_state("confirmation", "TRV-20931"))
                    },
                ))
                .transition("plan")
                .build(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_registry_builds() {
        let registry = registry("http://127.0.0.1:8000").unwrap();
        assert_eq!(registry.descriptors().len(), 2);
        assert_eq!(registry.search("real estate")[0].name, "zillow");
        assert_eq!(registry.search("hotels")[0].name, "travel");
    }

    #[test]
    fn portfolio_keeps_tool_order() {
        let workflow = zillow().unwrap();
        let portfolio = workflow.stage("portfolio").unwrap();
        let names: Vec<&str> = portfolio.tool_names().collect();
        assert_eq!(
            names,
            [
                "monitor_property_values",
                "track_rent_comps",
                "detect_refi_opportunities",
                "run_cost_segregation",
                "simulate_rebalance",
            ]
        );
        assert!(portfolio.transitions().is_empty());
    }
}
