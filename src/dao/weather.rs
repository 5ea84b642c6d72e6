use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{
        CityAddInputType, CityAverageType, CityListElementType, CityType, CityUpdateInputType, ClimateAverageType, QueryAverageDbResp, QueryCityDbResp, QueryCityListDbResp, QueryStateDbResp,
        QueryTemperatureDbResp, StateAddInputType, StateType, StateUpdateInputType, TemperatureAddInputType, TemperatureType, TemperatureUpdateInputType,
    },
};

/**
 * Primary key of the states table.
 */
const STATES_PKEY: &str = "states_pkey";

/**
 * Unique constraint on city names.
 */
const CITIES_NAME: &str = "cities_name";

/**
 * Foreign key from cities to states.
 */
const CITIES_STATE: &str = "cities_state";

/**
 * Unique constraint allowing one temperature per city and date.
 */
const CITY_DATE: &str = "city_date";

/**
 * Foreign key from temperatures to cities.
 */
const TEMPERATURES_CITY: &str = "temperatures_city";

/**
 * Messages for constraint violations on state inserts and updates.
 */
const STATE_WRITE_MESSAGES: &[(&str, &str)] = &[(STATES_PKEY, "The state already exists")];

/**
 * Messages for constraint violations on state deletes.
 */
const STATE_DELETE_MESSAGES: &[(&str, &str)] = &[(CITIES_STATE, "The state still has cities")];

/**
 * Messages for constraint violations on city inserts.
 */
const CITY_ADD_MESSAGES: &[(&str, &str)] = &[(CITIES_NAME, "The city already exists"), (CITIES_STATE, "The state does not exist")];

/**
 * Messages for constraint violations on city updates.
 */
const CITY_UPDATE_MESSAGES: &[(&str, &str)] = &[(CITIES_NAME, "The city already exists")];

/**
 * Messages for constraint violations on city deletes.
 */
const CITY_DELETE_MESSAGES: &[(&str, &str)] = &[(TEMPERATURES_CITY, "The city still has temperatures")];

/**
 * Messages for constraint violations on temperature inserts.
 */
const TEMPERATURE_ADD_MESSAGES: &[(&str, &str)] = &[(CITY_DATE, "The temperature already exists for that day in this city."), (TEMPERATURES_CITY, "The city does not exist")];

/**
 * SQL query to retrieve all states.
 */
const QUERY_STATES_LIST: &str = "SELECT abbrev, name FROM states ORDER BY abbrev";

/**
 * SQL query to retrieve a single state.
 */
const QUERY_STATE: &str = "SELECT abbrev, name FROM states WHERE abbrev = $1";

/**
 * SQL query to lock a single state before it is changed.
 */
const QUERY_STATE_FOR_UPDATE: &str = "SELECT abbrev, name FROM states WHERE abbrev = $1 FOR UPDATE";

/**
 * SQL query to add a new state.
 */
const ADD_STATE: &str = "INSERT INTO states (abbrev, name) VALUES ($1, $2)";

/**
 * SQL query to update a state. Null parameters keep the stored value.
 */
const UPDATE_STATE: &str = "UPDATE states SET abbrev = COALESCE($1, abbrev), name = COALESCE($2, name) WHERE abbrev = $3 RETURNING abbrev, name";

/**
 * SQL query to delete a state.
 */
const DELETE_STATE: &str = "DELETE FROM states WHERE abbrev = $1";

/**
 * SQL query to retrieve all cities together with the name of their state.
 */
const QUERY_CITIES_LIST: &str = "SELECT cities.id, cities.name AS city, states.name AS state
                                 FROM cities
                                 INNER JOIN states ON states.abbrev = cities.state_abbrev
                                 ORDER BY cities.id";

/**
 * SQL query to retrieve a single city.
 */
const QUERY_CITY: &str = "SELECT id, state_abbrev, name, climate FROM cities WHERE id = $1";

/**
 * SQL query to lock a single city before it is changed.
 */
const QUERY_CITY_FOR_UPDATE: &str = "SELECT id, state_abbrev, name, climate FROM cities WHERE id = $1 FOR UPDATE";

/**
 * SQL query to add a new city.
 */
const ADD_CITY: &str = "INSERT INTO cities (state_abbrev, name, climate) VALUES ($1, $2, $3) RETURNING id";

/**
 * SQL query to update a city. Null parameters keep the stored value.
 */
const UPDATE_CITY: &str = "UPDATE cities SET name = COALESCE($1, name), climate = COALESCE($2, climate) WHERE id = $3 RETURNING id, state_abbrev, name, climate";

/**
 * SQL query to delete a city.
 */
const DELETE_CITY: &str = "DELETE FROM cities WHERE id = $1";

/**
 * SQL query for the average temperature of one city.
 */
const QUERY_CITY_AVERAGE: &str = "SELECT cities.name, AVG(temperatures.temperature)
                                  FROM temperatures
                                  INNER JOIN cities ON cities.id = temperatures.city_id
                                  WHERE temperatures.city_id = $1
                                  GROUP BY cities.name";

/**
 * SQL query for the average temperature of all cities with a climate.
 */
const QUERY_CLIMATE_AVERAGE: &str = "SELECT cities.climate, AVG(temperatures.temperature)
                                     FROM temperatures
                                     INNER JOIN cities ON cities.id = temperatures.city_id
                                     WHERE cities.climate = $1
                                     GROUP BY cities.climate";

/**
 * SQL query to retrieve all temperatures recorded for a city.
 */
const QUERY_CITY_TEMPERATURES: &str = "SELECT id, city_id, temperature, date FROM temperatures WHERE city_id = $1 ORDER BY date";

/**
 * SQL query to lock a single temperature before it is changed.
 */
const QUERY_TEMPERATURE_FOR_UPDATE: &str = "SELECT id, city_id, temperature, date FROM temperatures WHERE id = $1 FOR UPDATE";

/**
 * SQL query to add a new temperature.
 */
const ADD_TEMPERATURE: &str = "INSERT INTO temperatures (city_id, temperature, date) VALUES ($1, $2, $3)";

/**
 * SQL query to update the value of a temperature.
 */
const UPDATE_TEMPERATURE: &str = "UPDATE temperatures SET temperature = $1 WHERE id = $2 RETURNING id, city_id, temperature, date";

/**
 * SQL query to delete a temperature.
 */
const DELETE_TEMPERATURE: &str = "DELETE FROM temperatures WHERE id = $1";

/**
 * DAO for states, cities and temperatures.
 */
pub struct WeatherDao {}

impl WeatherDao {
    /**
     * Creates a new instance of `WeatherDao`.
     *
     * # Returns
     * A new instance of `WeatherDao`.
     */
    pub fn new() -> Self {
        WeatherDao {}
    }

    /***************** States *********************/

    /**
     * Retrieves all states.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A Result containing the states or an `ApplicationError`.
     */
    #[instrument(skip(self, connection))]
    pub async fn list_states(&self, connection: &mut PgConnection) -> Result<Vec<StateType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryStateDbResp> = sqlx::query_as(QUERY_STATES_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(results.into_iter().map(StateType::from).collect())
    }

    /**
     * Retrieves a single state by abbreviation.
     *
     * # Arguments
     * `connection`: The database connection.
     * `abbrev`: The state abbreviation.
     *
     * # Returns
     * The state, `None` if it does not exist, or an `ApplicationError`.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_state(&self, connection: &mut PgConnection, abbrev: &str) -> Result<Option<StateType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryStateDbResp> = sqlx::query_as(QUERY_STATE)
            .bind(abbrev)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(result.map(StateType::from))
    }

    /**
     * Adds a new state.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `state_add_input`: The state to add.
     *
     * # Returns
     * A result indicating success, or a `UniqueViolation` if the abbreviation is taken.
     */
    #[instrument(skip(self, transaction))]
    pub async fn add_state(&self, transaction: &mut PgConnection, state_add_input: StateAddInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_STATE)
            .bind(state_add_input.abbrev)
            .bind(state_add_input.name)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, STATE_WRITE_MESSAGES))?;
        Ok(())
    }

    /**
     * Updates a state after confirming it exists.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `abbrev`: The current abbreviation of the state.
     * `state_update_input`: The new values.
     *
     * # Returns
     * The updated state, or `NotFound` without any change.
     */
    #[instrument(skip(self, transaction))]
    pub async fn update_state(&self, transaction: &mut PgConnection, abbrev: &str, state_update_input: StateUpdateInputType) -> Result<StateType, ApplicationError> {
        let span = tracing::Span::current();
        let existing: Option<QueryStateDbResp> = sqlx::query_as(QUERY_STATE_FOR_UPDATE)
            .bind(abbrev)
            .fetch_optional(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        if existing.is_none() {
            tracing::debug!("State {} not found for update", abbrev);
            return Err(ApplicationError::new(ErrorType::NotFound, "State not found".to_string()));
        }
        let result: QueryStateDbResp = sqlx::query_as(UPDATE_STATE)
            .bind(state_update_input.abbrev)
            .bind(state_update_input.name)
            .bind(abbrev)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, STATE_WRITE_MESSAGES))?;
        Ok(StateType::from(result))
    }

    /**
     * Deletes a state after confirming it exists. Fails while cities still reference it.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `abbrev`: The abbreviation of the state to delete.
     *
     * # Returns
     * A result indicating success, `NotFound` or `ForeignKeyViolation`.
     */
    #[instrument(skip(self, transaction))]
    pub async fn delete_state(&self, transaction: &mut PgConnection, abbrev: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let existing: Option<QueryStateDbResp> = sqlx::query_as(QUERY_STATE_FOR_UPDATE)
            .bind(abbrev)
            .fetch_optional(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        if existing.is_none() {
            tracing::debug!("State {} not found for deletion", abbrev);
            return Err(ApplicationError::new(ErrorType::NotFound, "State not found".to_string()));
        }
        sqlx::query(DELETE_STATE)
            .bind(abbrev)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, STATE_DELETE_MESSAGES))?;
        Ok(())
    }

    /***************** Cities *********************/

    /**
     * Retrieves all cities with the name of their state.
     */
    #[instrument(skip(self, connection))]
    pub async fn list_cities(&self, connection: &mut PgConnection) -> Result<Vec<CityListElementType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryCityListDbResp> = sqlx::query_as(QUERY_CITIES_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(results.into_iter().map(CityListElementType::from).collect())
    }

    /**
     * Retrieves a single city by id.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_city(&self, connection: &mut PgConnection, city_id: i64) -> Result<Option<CityType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryCityDbResp> = sqlx::query_as(QUERY_CITY)
            .bind(city_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(result.map(CityType::from))
    }

    /**
     * Adds a new city.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `city_add_input`: The city to add.
     *
     * # Returns
     * The generated id, a `UniqueViolation` on a duplicate name or a `ForeignKeyViolation` on an unknown state.
     */
    #[instrument(skip(self, transaction))]
    pub async fn add_city(&self, transaction: &mut PgConnection, city_add_input: CityAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_CITY)
            .bind(city_add_input.state_abbrev)
            .bind(city_add_input.name)
            .bind(city_add_input.climate)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, CITY_ADD_MESSAGES))?;
        Ok(id.0)
    }

    /**
     * Updates a city after confirming it exists.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `city_id`: The id of the city.
     * `city_update_input`: The new values.
     *
     * # Returns
     * The updated city, or `NotFound` without any change.
     */
    #[instrument(skip(self, transaction))]
    pub async fn update_city(&self, transaction: &mut PgConnection, city_id: i64, city_update_input: CityUpdateInputType) -> Result<CityType, ApplicationError> {
        let span = tracing::Span::current();
        let existing: Option<QueryCityDbResp> = sqlx::query_as(QUERY_CITY_FOR_UPDATE)
            .bind(city_id)
            .fetch_optional(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        if existing.is_none() {
            tracing::debug!("City with id {} not found for update", city_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "City not found".to_string()));
        }
        let result: QueryCityDbResp = sqlx::query_as(UPDATE_CITY)
            .bind(city_update_input.name)
            .bind(city_update_input.climate)
            .bind(city_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, CITY_UPDATE_MESSAGES))?;
        Ok(CityType::from(result))
    }

    /**
     * Deletes a city after confirming it exists. Fails while temperatures still reference it.
     */
    #[instrument(skip(self, transaction))]
    pub async fn delete_city(&self, transaction: &mut PgConnection, city_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let existing: Option<QueryCityDbResp> = sqlx::query_as(QUERY_CITY_FOR_UPDATE)
            .bind(city_id)
            .fetch_optional(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        if existing.is_none() {
            tracing::debug!("City with id {} not found for deletion", city_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "City not found".to_string()));
        }
        sqlx::query(DELETE_CITY)
            .bind(city_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, CITY_DELETE_MESSAGES))?;
        Ok(())
    }

    /**
     * Average temperature of a city.
     *
     * # Arguments
     * `connection`: The database connection.
     * `city_id`: The id of the city.
     *
     * # Returns
     * The city name with its average, or `None` if the city has no temperatures.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_city_average(&self, connection: &mut PgConnection, city_id: i64) -> Result<Option<CityAverageType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryAverageDbResp> = sqlx::query_as(QUERY_CITY_AVERAGE)
            .bind(city_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(result.map(CityAverageType::from))
    }

    /***************** Temperatures *********************/

    /**
     * Average temperature over every city with the given climate.
     *
     * # Returns
     * The climate with its average, or `None` if no temperatures exist for it.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_climate_average(&self, connection: &mut PgConnection, climate: &str) -> Result<Option<ClimateAverageType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryAverageDbResp> = sqlx::query_as(QUERY_CLIMATE_AVERAGE)
            .bind(climate)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(result.map(ClimateAverageType::from))
    }

    /**
     * Retrieves every temperature recorded for a city, ordered by date.
     */
    #[instrument(skip(self, connection))]
    pub async fn list_city_temperatures(&self, connection: &mut PgConnection, city_id: i64) -> Result<Vec<TemperatureType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryTemperatureDbResp> = sqlx::query_as(QUERY_CITY_TEMPERATURES)
            .bind(city_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(results.into_iter().map(TemperatureType::from).collect())
    }

    /**
     * Adds a temperature reading.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `temperature_add_input`: The reading to add.
     *
     * # Returns
     * A result indicating success, a `UniqueViolation` if the city already has a reading for the date
     * or a `ForeignKeyViolation` on an unknown city.
     */
    #[instrument(skip(self, transaction))]
    pub async fn add_temperature(&self, transaction: &mut PgConnection, temperature_add_input: TemperatureAddInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_TEMPERATURE)
            .bind(temperature_add_input.city_id)
            .bind(temperature_add_input.temperature)
            .bind(temperature_add_input.date)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, TEMPERATURE_ADD_MESSAGES))?;
        Ok(())
    }

    /**
     * Updates the value of a temperature after confirming it exists.
     */
    #[instrument(skip(self, transaction))]
    pub async fn update_temperature(&self, transaction: &mut PgConnection, temperature_id: i64, temperature_update_input: TemperatureUpdateInputType) -> Result<TemperatureType, ApplicationError> {
        let span = tracing::Span::current();
        let existing: Option<QueryTemperatureDbResp> = sqlx::query_as(QUERY_TEMPERATURE_FOR_UPDATE)
            .bind(temperature_id)
            .fetch_optional(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        if existing.is_none() {
            tracing::debug!("Temperature with id {} not found for update", temperature_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Temperature not found".to_string()));
        }
        let result: QueryTemperatureDbResp = sqlx::query_as(UPDATE_TEMPERATURE)
            .bind(temperature_update_input.temperature)
            .bind(temperature_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(TemperatureType::from(result))
    }

    /**
     * Deletes a temperature after confirming it exists.
     */
    #[instrument(skip(self, transaction))]
    pub async fn delete_temperature(&self, transaction: &mut PgConnection, temperature_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let existing: Option<QueryTemperatureDbResp> = sqlx::query_as(QUERY_TEMPERATURE_FOR_UPDATE)
            .bind(temperature_id)
            .fetch_optional(&mut *transaction)
            .instrument(span.clone())
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        if existing.is_none() {
            tracing::debug!("Temperature with id {} not found for deletion", temperature_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Temperature not found".to_string()));
        }
        sqlx::query(DELETE_TEMPERATURE)
            .bind(temperature_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| Self::handle_database_error(&err, &[]))?;
        Ok(())
    }

    /**
     * Maps database errors to application errors.
     *
     * Constraint violations are classified by SQLSTATE. The message is taken from
     * `constraint_messages` when the violated constraint is listed there.
     *
     * # Arguments
     * `error`: The error returned by sqlx.
     * `constraint_messages`: Pairs of constraint name and message for the caller.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: &sqlx::Error, constraint_messages: &[(&str, &str)]) -> ApplicationError {
        let Some(db_error) = error.as_database_error() else {
            tracing::error!("Failed to execute database operation: {}", error);
            return ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string());
        };
        tracing::debug!("Database error: {}", db_error);
        let constraint_message = db_error
            .constraint()
            .and_then(|constraint| constraint_messages.iter().find(|(name, _)| *name == constraint))
            .map(|(_, message)| (*message).to_string());
        match db_error.code().as_deref() {
            Some("23505") => {
                tracing::info!("Unique violation on {:?}", db_error.constraint());
                ApplicationError::new(ErrorType::UniqueViolation, constraint_message.unwrap_or_else(|| "Already exists".to_string()))
            }
            Some("23503") => {
                tracing::info!("Foreign key violation on {:?}", db_error.constraint());
                ApplicationError::new(ErrorType::ForeignKeyViolation, constraint_message.unwrap_or_else(|| "Missing parent value".to_string()))
            }
            Some("22001") => ApplicationError::new(ErrorType::Validation, "Value too long".to_string()),
            Some("22003") => ApplicationError::new(ErrorType::Validation, "Value out of range".to_string()),
            Some("23502") => ApplicationError::new(ErrorType::Validation, "Missing required value".to_string()),
            _ => {
                tracing::error!("Unhandled database error: {}", db_error);
                ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string())
            }
        }
    }
}
