//! Read-only bundle of the indicator tables an allocation may consume.
//!
//! Allocators borrow the tables for the duration of one call and never mutate
//! them, so the same bundle can be shared across parallel grid cells.
use crate::{
    allocation::errors::{AllocResult, AllocationError},
    data::table::IndicatorTable,
};

#[derive(Debug, Clone, Copy)]
pub struct AllocationInputs<'a> {
    pub population: &'a IndicatorTable,
    pub emissions: Option<&'a IndicatorTable>,
    pub gdp: Option<&'a IndicatorTable>,
    pub gini: Option<&'a IndicatorTable>,
    pub world_pathway: Option<&'a IndicatorTable>,
}

impl<'a> AllocationInputs<'a> {
    pub fn new(population: &'a IndicatorTable) -> Self {
        Self { population, emissions: None, gdp: None, gini: None, world_pathway: None }
    }

    pub fn with_emissions(mut self, emissions: &'a IndicatorTable) -> Self {
        self.emissions = Some(emissions);
        self
    }

    pub fn with_gdp(mut self, gdp: &'a IndicatorTable) -> Self {
        self.gdp = Some(gdp);
        self
    }

    pub fn with_gini(mut self, gini: &'a IndicatorTable) -> Self {
        self.gini = Some(gini);
        self
    }

    pub fn with_world_pathway(mut self, world_pathway: &'a IndicatorTable) -> Self {
        self.world_pathway = Some(world_pathway);
        self
    }

    pub fn require_emissions(&self, approach: &str) -> AllocResult<&'a IndicatorTable> {
        self.emissions.ok_or_else(|| missing("emissions", approach))
    }

    pub fn require_gdp(&self, approach: &str) -> AllocResult<&'a IndicatorTable> {
        self.gdp.ok_or_else(|| missing("GDP", approach))
    }

    pub fn require_gini(&self, approach: &str) -> AllocResult<&'a IndicatorTable> {
        self.gini.ok_or_else(|| missing("Gini", approach))
    }

    pub fn require_world_pathway(&self, approach: &str) -> AllocResult<&'a IndicatorTable> {
        self.world_pathway.ok_or_else(|| missing("world pathway", approach))
    }
}

fn missing(indicator: &'static str, approach: &str) -> AllocationError {
    AllocationError::MissingRequiredInput { indicator, approach: approach.to_string() }
}
