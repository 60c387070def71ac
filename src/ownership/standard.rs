//! Built-in chapter layout for a residential property report.
//!
//! Keys appear in more than one chapter only where the chapter genuinely
//! reasons about them (the executive summary and financing both need the
//! asking price). Legal chapters never see pricing data.

use super::{ChapterDefinition, OwnershipScope};

pub(super) const EXECUTIVE_SUMMARY_MIN_WORDS: usize = 500;

const CHAPTERS: &[(&str, &str, &[&str])] = &[
    (
        "ch0",
        "Executive summary",
        &[
            "address",
            "property_type",
            "asking_price",
            "living_area",
            "plot_area",
            "build_year",
            "energy_label",
            "price_per_m2",
        ],
    ),
    (
        "ch1",
        "General features",
        &[
            "address",
            "property_type",
            "build_year",
            "living_area",
            "plot_area",
            "volume",
            "rooms",
            "bedrooms",
        ],
    ),
    (
        "ch2",
        "Price and value",
        &[
            "asking_price",
            "price_per_m2",
            "woz_value",
            "estimated_market_value",
            "price_history",
        ],
    ),
    (
        "ch3",
        "Location",
        &[
            "address",
            "neighbourhood",
            "distance_to_centre",
            "distance_to_station",
            "nearby_schools",
        ],
    ),
    (
        "ch4",
        "Energy and sustainability",
        &[
            "energy_label",
            "insulation",
            "heating_type",
            "solar_panels",
            "estimated_energy_cost",
        ],
    ),
    (
        "ch5",
        "Layout",
        &["living_area", "rooms", "bedrooms", "bathrooms", "floors"],
    ),
    (
        "ch6",
        "Maintenance and condition",
        &[
            "build_year",
            "renovation_year",
            "roof_condition",
            "maintenance_state",
            "foundation_type",
        ],
    ),
    (
        "ch7",
        "Garden and outdoor space",
        &["plot_area", "garden_area", "garden_orientation", "balcony"],
    ),
    (
        "ch8",
        "Parking and accessibility",
        &["parking_type", "garage", "distance_to_station", "accessibility"],
    ),
    (
        "ch9",
        "Legal and ownership",
        &[
            "ownership_type",
            "ground_lease",
            "ground_lease_terms",
            "hoa_contribution",
            "zoning",
        ],
    ),
    (
        "ch10",
        "Financing",
        &[
            "asking_price",
            "estimated_monthly_cost",
            "interest_rate_assumption",
            "transfer_tax",
        ],
    ),
    (
        "ch11",
        "Future potential",
        &["plot_area", "zoning", "extension_potential", "renovation_year"],
    ),
    (
        "ch12",
        "Market position",
        &[
            "days_on_market",
            "comparable_sales",
            "price_per_m2",
            "neighbourhood_price_trend",
        ],
    ),
    (
        "ch13",
        "Bidding advice",
        &[
            "asking_price",
            "estimated_market_value",
            "days_on_market",
            "comparable_sales",
        ],
    ),
];

pub(super) fn chapters() -> Vec<ChapterDefinition> {
    CHAPTERS
        .iter()
        .map(|(id, title, keys)| {
            let scope = OwnershipScope::new(*id, keys.iter().copied());
            let def = ChapterDefinition::new(scope, *title);
            if *id == "ch0" {
                def.with_min_words(EXECUTIVE_SUMMARY_MIN_WORDS)
            } else {
                def
            }
        })
        .collect()
}
