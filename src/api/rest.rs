use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::ContentType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{
        CityAddInputType, CityAverageType, CityListElementType, CityType, CityUpdateInputType, ClimateAverageType, StateAddInputType, StateType, StateUpdateInputType, TemperatureAddInputType,
        TemperatureType, TemperatureUpdateInputType,
    },
};

/***************** States models *********************/

/**
 * Request body for adding a state.
 */
#[derive(Debug, Deserialize)]
pub struct StateAddRequest {
    pub abbrev: Option<String>,
    pub name: Option<String>,
}

impl TryFrom<StateAddRequest> for StateAddInputType {
    type Error = ApplicationError;

    fn try_from(request: StateAddRequest) -> Result<Self, Self::Error> {
        StateAddInputType { abbrev: required("abbrev", request.abbrev)?, name: required("name", request.name)? }.validate()
    }
}

/**
 * Request body for updating a state. Absent fields are left unchanged.
 */
#[derive(Debug, Deserialize)]
pub struct StateUpdateRequest {
    pub abbrev: Option<String>,
    pub name: Option<String>,
}

impl TryFrom<StateUpdateRequest> for StateUpdateInputType {
    type Error = ApplicationError;

    fn try_from(request: StateUpdateRequest) -> Result<Self, Self::Error> {
        StateUpdateInputType { abbrev: request.abbrev, name: request.name }.validate()
    }
}

/**
 * A state as returned by the API.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StateResponse {
    /**
     * The unique state abbreviation.
     */
    pub abbrev: String,
    /**
     * The display name of the state.
     */
    pub name: String,
}

impl From<StateType> for StateResponse {
    fn from(state: StateType) -> Self {
        StateResponse { abbrev: state.abbrev, name: state.name }
    }
}

/***************** Cities models *********************/

/**
 * Request body for adding a city.
 */
#[derive(Debug, Deserialize)]
pub struct CityAddRequest {
    pub state_abbrev: Option<String>,
    pub name: Option<String>,
    pub climate: Option<String>,
}

impl TryFrom<CityAddRequest> for CityAddInputType {
    type Error = ApplicationError;

    fn try_from(request: CityAddRequest) -> Result<Self, Self::Error> {
        CityAddInputType { state_abbrev: required("state_abbrev", request.state_abbrev)?, name: required("name", request.name)?, climate: required("climate", request.climate)? }.validate()
    }
}

/**
 * Request body for updating a city. Absent fields are left unchanged.
 */
#[derive(Debug, Deserialize)]
pub struct CityUpdateRequest {
    pub name: Option<String>,
    pub climate: Option<String>,
}

impl TryFrom<CityUpdateRequest> for CityUpdateInputType {
    type Error = ApplicationError;

    fn try_from(request: CityUpdateRequest) -> Result<Self, Self::Error> {
        CityUpdateInputType { name: request.name, climate: request.climate }.validate()
    }
}

/**
 * Element of the city list: the city id, the city name and the name of its state.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CityListElement {
    pub id: i64,
    pub city: String,
    pub state: String,
}

impl From<CityListElementType> for CityListElement {
    fn from(element: CityListElementType) -> Self {
        CityListElement { id: element.id, city: element.city, state: element.state }
    }
}

/**
 * A city as returned by the API.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CityResponse {
    /**
     * The generated id of the city.
     */
    pub id: i64,
    /**
     * Abbreviation of the state the city belongs to.
     */
    pub state_abbrev: String,
    /**
     * The unique name of the city.
     */
    pub name: String,
    /**
     * Free-form climate classification.
     */
    pub climate: String,
}

impl From<CityType> for CityResponse {
    fn from(city: CityType) -> Self {
        CityResponse { id: city.id, state_abbrev: city.state_abbrev, name: city.name, climate: city.climate }
    }
}

/**
 * Average temperature of a city.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CityAverageResponse {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg: Decimal,
}

impl From<CityAverageType> for CityAverageResponse {
    fn from(average: CityAverageType) -> Self {
        CityAverageResponse { name: average.name, avg: average.avg }
    }
}

/***************** Temperatures models *********************/

/**
 * Request body for adding a temperature.
 */
#[derive(Debug, Deserialize)]
pub struct TemperatureAddRequest {
    pub city_id: Option<i64>,
    pub temperature: Option<Decimal>,
    pub date: Option<NaiveDate>,
}

impl TryFrom<TemperatureAddRequest> for TemperatureAddInputType {
    type Error = ApplicationError;

    fn try_from(request: TemperatureAddRequest) -> Result<Self, Self::Error> {
        TemperatureAddInputType { city_id: required("city_id", request.city_id)?, temperature: required("temperature", request.temperature)?, date: required("date", request.date)? }.validate()
    }
}

/**
 * Request body for updating a temperature.
 */
#[derive(Debug, Deserialize)]
pub struct TemperatureUpdateRequest {
    pub temperature: Option<Decimal>,
}

impl TryFrom<TemperatureUpdateRequest> for TemperatureUpdateInputType {
    type Error = ApplicationError;

    fn try_from(request: TemperatureUpdateRequest) -> Result<Self, Self::Error> {
        TemperatureUpdateInputType { temperature: required("temperature", request.temperature)? }.validate()
    }
}

/**
 * A temperature reading as returned by the API.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TemperatureResponse {
    /**
     * The generated id of the reading.
     */
    pub id: i64,
    /**
     * The city the reading belongs to.
     */
    pub city_id: i64,
    /**
     * The measured temperature.
     */
    #[serde(with = "rust_decimal::serde::float")]
    pub temperature: Decimal,
    /**
     * The day of the reading.
     */
    pub date: NaiveDate,
}

impl From<TemperatureType> for TemperatureResponse {
    fn from(temperature: TemperatureType) -> Self {
        TemperatureResponse { id: temperature.id, city_id: temperature.city_id, temperature: temperature.temperature, date: temperature.date }
    }
}

/**
 * Average temperature of a climate.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ClimateAverageResponse {
    pub climate: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg: Decimal,
}

impl From<ClimateAverageType> for ClimateAverageResponse {
    fn from(average: ClimateAverageType) -> Self {
        ClimateAverageResponse { climate: average.climate, avg: average.avg }
    }
}

/***************** Error models *********************/

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates a plain text error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).insert_header(ContentType::plaintext()).body(self.message.clone())
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `error_type`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(error_type: &ErrorType) -> StatusCode {
    match error_type {
        ErrorType::Validation | ErrorType::UniqueViolation | ErrorType::ForeignKeyViolation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::Initialization | ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/***************** Common *********************/

fn required<T>(field: &str, value: Option<T>) -> Result<T, ApplicationError> {
    value.ok_or_else(|| ApplicationError::new(ErrorType::Validation, format!("Missing field: {field}")))
}
