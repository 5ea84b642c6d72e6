use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Database response type for a state row: abbrev, name.
 */
pub type QueryStateDbResp = (String, String);

/**
 * Database response type for the joined city list: city id, city name, state name.
 */
pub type QueryCityListDbResp = (i64, String, String);

/**
 * Database response type for a city row: id, state_abbrev, name, climate.
 */
pub type QueryCityDbResp = (i64, String, String, String);

/**
 * Database response type for an average grouped by a label: label, average.
 */
pub type QueryAverageDbResp = (String, Decimal);

/**
 * Database response type for a temperature row: id, city_id, temperature, date.
 */
pub type QueryTemperatureDbResp = (i64, i64, Decimal, NaiveDate);

/***************** States *********************/

/**
 * A state keyed by its abbreviation.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct StateType {
    pub abbrev: String,
    pub name: String,
}

impl From<QueryStateDbResp> for StateType {
    fn from((abbrev, name): QueryStateDbResp) -> Self {
        StateType { abbrev, name }
    }
}

/**
 * Input for creating a new state.
 */
#[derive(Debug, Clone)]
pub struct StateAddInputType {
    pub abbrev: String,
    pub name: String,
}

impl StateAddInputType {
    /**
     * Validates the input.
     *
     * # Returns
     * The trimmed input or a validation error.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        Ok(StateAddInputType { abbrev: require_text("abbrev", self.abbrev)?, name: require_text("name", self.name)? })
    }
}

/**
 * Input for updating a state. Absent fields keep their stored value.
 */
#[derive(Debug, Clone)]
pub struct StateUpdateInputType {
    pub abbrev: Option<String>,
    pub name: Option<String>,
}

impl StateUpdateInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.abbrev.is_none() && self.name.is_none() {
            return Err(ApplicationError::new(ErrorType::Validation, "Nothing to update, expected abbrev or name".to_string()));
        }
        Ok(StateUpdateInputType { abbrev: optional_text("abbrev", self.abbrev)?, name: optional_text("name", self.name)? })
    }
}

/***************** Cities *********************/

/**
 * A city as listed in the city collection, joined with its state name.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct CityListElementType {
    pub id: i64,
    pub city: String,
    pub state: String,
}

impl From<QueryCityListDbResp> for CityListElementType {
    fn from((id, city, state): QueryCityListDbResp) -> Self {
        CityListElementType { id, city, state }
    }
}

/**
 * A city row.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct CityType {
    pub id: i64,
    pub state_abbrev: String,
    pub name: String,
    pub climate: String,
}

impl From<QueryCityDbResp> for CityType {
    fn from((id, state_abbrev, name, climate): QueryCityDbResp) -> Self {
        CityType { id, state_abbrev, name, climate }
    }
}

/**
 * Average temperature of a single city.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct CityAverageType {
    pub name: String,
    pub avg: Decimal,
}

impl From<QueryAverageDbResp> for CityAverageType {
    fn from((name, avg): QueryAverageDbResp) -> Self {
        CityAverageType { name, avg }
    }
}

/**
 * Input for creating a new city.
 */
#[derive(Debug, Clone)]
pub struct CityAddInputType {
    pub state_abbrev: String,
    pub name: String,
    pub climate: String,
}

impl CityAddInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        Ok(CityAddInputType {
            state_abbrev: require_text("state_abbrev", self.state_abbrev)?,
            name: require_text("name", self.name)?,
            climate: require_text("climate", self.climate)?,
        })
    }
}

/**
 * Input for updating a city. Absent fields keep their stored value.
 */
#[derive(Debug, Clone)]
pub struct CityUpdateInputType {
    pub name: Option<String>,
    pub climate: Option<String>,
}

impl CityUpdateInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.name.is_none() && self.climate.is_none() {
            return Err(ApplicationError::new(ErrorType::Validation, "Nothing to update, expected name or climate".to_string()));
        }
        Ok(CityUpdateInputType { name: optional_text("name", self.name)?, climate: optional_text("climate", self.climate)? })
    }
}

/***************** Temperatures *********************/

/**
 * A single dated temperature reading.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureType {
    pub id: i64,
    pub city_id: i64,
    pub temperature: Decimal,
    pub date: NaiveDate,
}

impl From<QueryTemperatureDbResp> for TemperatureType {
    fn from((id, city_id, temperature, date): QueryTemperatureDbResp) -> Self {
        TemperatureType { id, city_id, temperature, date }
    }
}

/**
 * Average temperature over all cities sharing a climate.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateAverageType {
    pub climate: String,
    pub avg: Decimal,
}

impl From<QueryAverageDbResp> for ClimateAverageType {
    fn from((climate, avg): QueryAverageDbResp) -> Self {
        ClimateAverageType { climate, avg }
    }
}

/**
 * Input for adding a temperature reading.
 */
#[derive(Debug, Clone)]
pub struct TemperatureAddInputType {
    pub city_id: i64,
    pub temperature: Decimal,
    pub date: NaiveDate,
}

impl TemperatureAddInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        check_temperature_scale(self.temperature)?;
        Ok(self)
    }
}

/**
 * Input for updating a temperature reading.
 */
#[derive(Debug, Clone)]
pub struct TemperatureUpdateInputType {
    pub temperature: Decimal,
}

impl TemperatureUpdateInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        check_temperature_scale(self.temperature)?;
        Ok(self)
    }
}

/***************** Helpers *********************/

const TEMPERATURE_SCALE: u32 = 2;

/**
 * Requires a text field to contain something other than whitespace.
 *
 * # Arguments
 * `field`: Field name used in the error message.
 * `value`: The value to check.
 *
 * # Returns
 * The trimmed value or a validation error.
 */
fn require_text(field: &str, value: String) -> Result<String, ApplicationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApplicationError::new(ErrorType::Validation, format!("Field {field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, ApplicationError> {
    value.map(|value| require_text(field, value)).transpose()
}

/**
 * Temperatures are stored with two decimal places. Anything finer is rejected instead of rounded.
 */
fn check_temperature_scale(temperature: Decimal) -> Result<(), ApplicationError> {
    if temperature.normalize().scale() > TEMPERATURE_SCALE {
        return Err(ApplicationError::new(ErrorType::Validation, format!("Field temperature must have at most {TEMPERATURE_SCALE} decimal places")));
    }
    Ok(())
}
