//! Source descriptor registry — static catalog of every known dataset.
//!
//! Adding a data source means adding one descriptor here; the normalizer
//! dispatches on the descriptor's layout and never grows per-source
//! branches.

use crate::error::PipelineError;
use crate::types::GeoLevel;

/// How a source lays out its wide extract.
#[derive(Debug, Clone, Copy)]
pub enum SourceLayout {
    /// Identifier columns plus one column per `YYYY-MM` month, all
    /// tracking a single metric.
    TimeSeriesWide { metric: &'static str },
    /// Identifier columns plus one column per raw variable code; every
    /// variable shares the caller-supplied survey period.
    CodedVariableWide {
        variable_map: &'static [(&'static str, &'static str)],
    },
}

/// Immutable description of one dataset. `id_columns` is ordered: the
/// first entry is the geography key column, the second the display name.
/// Columns not listed here and not recognized as periods/variable codes
/// are metadata and get ignored.
#[derive(Debug, Clone, Copy)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub geo_level: GeoLevel,
    pub layout: SourceLayout,
    pub id_columns: &'static [&'static str],
}

impl SourceDescriptor {
    pub fn geo_id_column(&self) -> &'static str {
        self.id_columns[0]
    }

    pub fn geo_name_column(&self) -> &'static str {
        self.id_columns.get(1).copied().unwrap_or(self.id_columns[0])
    }
}

/// ACS 5-year estimate variable codes and their canonical metric names.
const ACS_VARIABLES: &[(&str, &str)] = &[
    // Population
    ("B01003_001E", "total_population"),
    ("B01002_001E", "median_age"),
    // Housing units
    ("B25001_001E", "total_housing_units"),
    ("B25002_002E", "occupied_housing_units"),
    ("B25002_003E", "vacant_housing_units"),
    ("B25003_002E", "owner_occupied_units"),
    ("B25003_003E", "renter_occupied_units"),
    // Home values
    ("B25077_001E", "median_home_value"),
    ("B25075_001E", "home_value_total"),
    // Rent
    ("B25064_001E", "median_gross_rent"),
    ("B25071_001E", "median_rent_as_pct_income"),
    // Income
    ("B19013_001E", "median_household_income"),
    ("B19301_001E", "per_capita_income"),
    // Housing costs
    ("B25088_002E", "median_mortgage_payment"),
    ("B25094_001E", "selected_monthly_owner_costs"),
    // Housing characteristics
    ("B25034_001E", "total_year_built"),
    ("B25035_001E", "median_year_built"),
    ("B25018_001E", "median_rooms"),
];

const INDEX_ID_COLUMNS: &[&str] = &["RegionID", "RegionName"];

const fn index_source(
    id: &'static str,
    geo_level: GeoLevel,
    metric: &'static str,
) -> SourceDescriptor {
    SourceDescriptor {
        id,
        geo_level,
        layout: SourceLayout::TimeSeriesWide { metric },
        id_columns: INDEX_ID_COLUMNS,
    }
}

const fn survey_source(
    id: &'static str,
    geo_level: GeoLevel,
    id_columns: &'static [&'static str],
) -> SourceDescriptor {
    SourceDescriptor {
        id,
        geo_level,
        layout: SourceLayout::CodedVariableWide {
            variable_map: ACS_VARIABLES,
        },
        id_columns,
    }
}

/// Every dataset the pipeline knows how to normalize.
static SOURCES: &[SourceDescriptor] = &[
    // Home value index
    index_source("zhvi_zip", GeoLevel::Zip, "home_value_index"),
    index_source("zhvi_metro", GeoLevel::Metro, "home_value_index"),
    index_source("zhvi_state", GeoLevel::State, "home_value_index"),
    index_source("zhvi_county", GeoLevel::County, "home_value_index"),
    // Observed rent index
    index_source("zori_metro", GeoLevel::Metro, "rent_index"),
    index_source("zori_zip", GeoLevel::Zip, "rent_index"),
    // Inventory and listings
    index_source("inventory_metro", GeoLevel::Metro, "for_sale_inventory"),
    index_source("new_listings_metro", GeoLevel::Metro, "new_listings"),
    index_source("days_on_market_metro", GeoLevel::Metro, "days_on_market"),
    index_source("price_cuts_metro", GeoLevel::Metro, "price_cut_pct"),
    // Sale prices
    index_source("sale_price_metro", GeoLevel::Metro, "median_sale_price"),
    index_source("sale_to_list_metro", GeoLevel::Metro, "sale_to_list_ratio"),
    // Annual survey extracts
    survey_source(
        "census_acs_zip",
        GeoLevel::Zip,
        &["zip code tabulation area", "NAME"],
    ),
    survey_source("census_acs_county", GeoLevel::County, &["county", "NAME"]),
    survey_source("census_acs_state", GeoLevel::State, &["state", "NAME"]),
];

/// Look up the descriptor for a source id.
pub fn describe(source_id: &str) -> Result<&'static SourceDescriptor, PipelineError> {
    SOURCES
        .iter()
        .find(|s| s.id == source_id)
        .ok_or_else(|| PipelineError::UnknownSource(source_id.to_string()))
}

/// All configured descriptors, for listings and tests.
pub fn all_sources() -> &'static [SourceDescriptor] {
    SOURCES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_are_unique() {
        let mut ids: Vec<&str> = all_sources().iter().map(|s| s.id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn all_sources_have_identifier_columns() {
        for source in all_sources() {
            assert!(!source.id.is_empty(), "source id is empty");
            assert!(
                !source.id_columns.is_empty(),
                "{}: no identifier columns",
                source.id
            );
            if let SourceLayout::CodedVariableWide { variable_map } = source.layout {
                assert!(!variable_map.is_empty(), "{}: empty variable map", source.id);
            }
        }
    }

    #[test]
    fn describe_known_and_unknown() {
        let desc = describe("zhvi_metro").unwrap();
        assert_eq!(desc.geo_level, GeoLevel::Metro);
        assert_eq!(desc.geo_id_column(), "RegionID");

        match describe("mls_feed") {
            Err(PipelineError::UnknownSource(id)) => assert_eq!(id, "mls_feed"),
            other => panic!("expected UnknownSource, got {other:?}"),
        }
    }

    #[test]
    fn acs_map_covers_core_housing_variables() {
        let desc = describe("census_acs_zip").unwrap();
        let SourceLayout::CodedVariableWide { variable_map } = desc.layout else {
            panic!("census source must be coded-variable-wide");
        };
        for metric in [
            "total_housing_units",
            "vacant_housing_units",
            "median_home_value",
            "median_gross_rent",
            "median_household_income",
        ] {
            assert!(
                variable_map.iter().any(|(_, name)| *name == metric),
                "missing {metric}"
            );
        }
    }
}
