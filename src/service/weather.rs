use sqlx::{Pool, Postgres, Transaction};

use crate::{
    dao::weather::WeatherDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{
            CityAddInputType, CityAverageType, CityListElementType, CityType, CityUpdateInputType, ClimateAverageType, StateAddInputType, StateType, StateUpdateInputType, TemperatureAddInputType,
            TemperatureType, TemperatureUpdateInputType,
        },
    },
};

/**
 * Represents the service for managing states, cities and temperatures.
 */
pub struct WeatherService {
    /**
     * The DAO for weather operations.
     */
    weather_dao: WeatherDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl WeatherService {
    /**
     * Creates a new instance of `WeatherService`.
     *
     * # Arguments
     * `weather_dao`: The DAO for weather operations.
     * `connection_pool`: Optional connection pool for database operations.
     *
     * # Returns
     * A new instance of `WeatherService`.
     */
    pub fn new(weather_dao: WeatherDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        WeatherService { weather_dao, connection_pool }
    }

    /***************** States *********************/

    /**
     * Retrieves all states.
     */
    pub async fn get_states_list(&self) -> Result<Vec<StateType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.weather_dao.list_states(&mut connection).await
    }

    /**
     * Retrieves a state by abbreviation.
     *
     * # Returns
     * The state or a `NotFound` error.
     */
    pub async fn get_state(&self, abbrev: &str) -> Result<StateType, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.weather_dao
            .get_state(&mut connection, abbrev)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "State was not found".to_string()))
    }

    /**
     * Adds a new state and reads back the stored row.
     *
     * # Arguments
     * `state_add_input`: The state to add.
     *
     * # Returns
     * The stored state or an `ApplicationError`.
     */
    pub async fn add_state(&self, state_add_input: StateAddInputType) -> Result<StateType, ApplicationError> {
        let mut transaction = self.begin().await?;
        let abbrev = state_add_input.abbrev.clone();
        let result = async {
            self.weather_dao.add_state(&mut transaction, state_add_input).await?;
            self.weather_dao.get_state(&mut transaction, &abbrev).await?.ok_or_else(|| Self::missing_after_insert("state"))
        }
        .await;
        Self::complete(transaction, result).await
    }

    /**
     * Updates a state.
     *
     * # Arguments
     * `abbrev`: The current abbreviation of the state.
     * `state_update_input`: The new values.
     *
     * # Returns
     * The updated state or an `ApplicationError`.
     */
    pub async fn update_state(&self, abbrev: &str, state_update_input: StateUpdateInputType) -> Result<StateType, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.weather_dao.update_state(&mut transaction, abbrev, state_update_input).await;
        Self::complete(transaction, result).await
    }

    /**
     * Deletes a state.
     */
    pub async fn delete_state(&self, abbrev: &str) -> Result<(), ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.weather_dao.delete_state(&mut transaction, abbrev).await;
        Self::complete(transaction, result).await
    }

    /***************** Cities *********************/

    /**
     * Retrieves all cities with their state names.
     */
    pub async fn get_cities_list(&self) -> Result<Vec<CityListElementType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.weather_dao.list_cities(&mut connection).await
    }

    /**
     * Retrieves the average temperature of a city.
     *
     * # Returns
     * The average or a `NotFound` error when the city has no temperatures.
     */
    pub async fn get_city_average(&self, city_id: i64) -> Result<CityAverageType, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.weather_dao
            .get_city_average(&mut connection, city_id)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Temperatures were not found".to_string()))
    }

    /**
     * Adds a new city and reads back the stored row.
     */
    pub async fn add_city(&self, city_add_input: CityAddInputType) -> Result<CityType, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = async {
            let city_id = self.weather_dao.add_city(&mut transaction, city_add_input).await?;
            self.weather_dao.get_city(&mut transaction, city_id).await?.ok_or_else(|| Self::missing_after_insert("city"))
        }
        .await;
        Self::complete(transaction, result).await
    }

    /**
     * Updates a city.
     */
    pub async fn update_city(&self, city_id: i64, city_update_input: CityUpdateInputType) -> Result<CityType, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.weather_dao.update_city(&mut transaction, city_id, city_update_input).await;
        Self::complete(transaction, result).await
    }

    /**
     * Deletes a city.
     */
    pub async fn delete_city(&self, city_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.weather_dao.delete_city(&mut transaction, city_id).await;
        Self::complete(transaction, result).await
    }

    /***************** Temperatures *********************/

    /**
     * Adds a temperature reading.
     *
     * # Arguments
     * `temperature_add_input`: The reading to add.
     *
     * # Returns
     * Every temperature of the city, including the new one.
     */
    pub async fn add_temperature(&self, temperature_add_input: TemperatureAddInputType) -> Result<Vec<TemperatureType>, ApplicationError> {
        let mut transaction = self.begin().await?;
        let city_id = temperature_add_input.city_id;
        let result = async {
            self.weather_dao.add_temperature(&mut transaction, temperature_add_input).await?;
            self.weather_dao.list_city_temperatures(&mut transaction, city_id).await
        }
        .await;
        Self::complete(transaction, result).await
    }

    /**
     * Retrieves the average temperature for a climate.
     */
    pub async fn get_climate_average(&self, climate: &str) -> Result<ClimateAverageType, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.weather_dao
            .get_climate_average(&mut connection, climate)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Could not find climate".to_string()))
    }

    /**
     * Updates a temperature reading.
     */
    pub async fn update_temperature(&self, temperature_id: i64, temperature_update_input: TemperatureUpdateInputType) -> Result<TemperatureType, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.weather_dao.update_temperature(&mut transaction, temperature_id, temperature_update_input).await;
        Self::complete(transaction, result).await
    }

    /**
     * Deletes a temperature reading.
     */
    pub async fn delete_temperature(&self, temperature_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.weather_dao.delete_temperature(&mut transaction, temperature_id).await;
        Self::complete(transaction, result).await
    }

    /***************** Helpers *********************/

    fn connection_pool(&self) -> Result<&Pool<Postgres>, ApplicationError> {
        self.connection_pool.as_ref().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()))
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Postgres>, ApplicationError> {
        self.connection_pool()?.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, ApplicationError> {
        self.connection_pool()?.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
    }

    /**
     * Commits the transaction when the result is ok, otherwise rolls it back.
     *
     * # Arguments
     * `transaction`: The transaction to finish.
     * `result`: The outcome of the work done within the transaction.
     *
     * # Returns
     * The result, or an error if the commit or rollback itself failed.
     */
    async fn complete<T>(transaction: Transaction<'static, Postgres>, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
        match result {
            Ok(value) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(value)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    fn missing_after_insert(entity: &str) -> ApplicationError {
        tracing::error!("Inserted {} could not be read back", entity);
        ApplicationError::new(ErrorType::DatabaseError, format!("Failed to read inserted {entity}"))
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    use super::*;

    fn service(pool: PgPool) -> WeatherService {
        WeatherService::new(WeatherDao::new(), Some(pool))
    }

    fn state(abbrev: &str, name: &str) -> StateAddInputType {
        StateAddInputType { abbrev: abbrev.to_string(), name: name.to_string() }
    }

    fn city(state_abbrev: &str, name: &str, climate: &str) -> CityAddInputType {
        CityAddInputType { state_abbrev: state_abbrev.to_string(), name: name.to_string(), climate: climate.to_string() }
    }

    fn temperature(city_id: i64, value: i64, day: u32) -> TemperatureAddInputType {
        TemperatureAddInputType { city_id, temperature: Decimal::from(value), date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap() }
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_add_then_get_state(pool: PgPool) {
        let weather_service = service(pool);
        let added = weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let fetched = weather_service.get_state("TX").await.unwrap();
        assert_eq!(added, fetched);
        assert_eq!(fetched, StateType { abbrev: "TX".to_string(), name: "Texas".to_string() });
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_duplicate_state(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let err = weather_service.add_state(state("TX", "Other")).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::UniqueViolation);
        assert_eq!(err.message, "The state already exists");
        assert_eq!(weather_service.get_state("TX").await.unwrap().name, "Texas");
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_city_with_unknown_state(pool: PgPool) {
        let weather_service = service(pool);
        let err = weather_service.add_city(city("ZZ", "Nowhere", "arid")).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::ForeignKeyViolation);
        assert_eq!(err.message, "The state does not exist");
        assert!(weather_service.get_cities_list().await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_duplicate_city_name(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        let err = weather_service.add_city(city("TX", "Austin", "arid")).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::UniqueViolation);
        assert_eq!(err.message, "The city already exists");
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_duplicate_temperature(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let austin = weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        weather_service.add_temperature(temperature(austin.id, 10, 1)).await.unwrap();
        let err = weather_service.add_temperature(temperature(austin.id, 15, 1)).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::UniqueViolation);
        assert_eq!(err.message, "The temperature already exists for that day in this city.");
        let temperatures = weather_service.add_temperature(temperature(austin.id, 12, 2)).await.unwrap();
        assert_eq!(temperatures.len(), 2);
        assert_eq!(temperatures[0].temperature, Decimal::from(10));
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_city_average(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let austin = weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        for (value, day) in [(10, 1), (20, 2), (30, 3)] {
            weather_service.add_temperature(temperature(austin.id, value, day)).await.unwrap();
        }
        let average = weather_service.get_city_average(austin.id).await.unwrap();
        assert_eq!(average.name, "Austin");
        assert_eq!(average.avg, Decimal::from(20));
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_climate_average_spans_cities(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("AZ", "Arizona")).await.unwrap();
        let phoenix = weather_service.add_city(city("AZ", "Phoenix", "arid")).await.unwrap();
        let tucson = weather_service.add_city(city("AZ", "Tucson", "arid")).await.unwrap();
        weather_service.add_temperature(temperature(phoenix.id, 30, 1)).await.unwrap();
        weather_service.add_temperature(temperature(tucson.id, 40, 1)).await.unwrap();
        let average = weather_service.get_climate_average("arid").await.unwrap();
        assert_eq!(average.climate, "arid");
        assert_eq!(average.avg, Decimal::from(35));
        let err = weather_service.get_climate_average("polar").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_delete_missing_rows(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        assert_eq!(weather_service.delete_state("ZZ").await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(weather_service.delete_city(42).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(weather_service.delete_temperature(42).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(weather_service.get_states_list().await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_update_missing_rows(pool: PgPool) {
        let weather_service = service(pool);
        let err = weather_service.update_state("ZZ", StateUpdateInputType { abbrev: Some("ZZ".to_string()), name: Some("Nowhere".to_string()) }).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        let err = weather_service.update_city(42, CityUpdateInputType { name: Some("Nowhere".to_string()), climate: None }).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        let err = weather_service.update_temperature(42, TemperatureUpdateInputType { temperature: Decimal::from(1) }).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
        assert!(weather_service.get_states_list().await.unwrap().is_empty());
        assert!(weather_service.get_cities_list().await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_delete_restricted_by_dependents(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let austin = weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        weather_service.add_temperature(temperature(austin.id, 10, 1)).await.unwrap();

        let err = weather_service.delete_state("TX").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::ForeignKeyViolation);
        assert_eq!(err.message, "The state still has cities");
        let err = weather_service.delete_city(austin.id).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::ForeignKeyViolation);
        assert_eq!(err.message, "The city still has temperatures");
        assert!(weather_service.get_state("TX").await.is_ok());

        let temperatures = weather_service.add_temperature(temperature(austin.id, 11, 2)).await.unwrap();
        for reading in temperatures {
            weather_service.delete_temperature(reading.id).await.unwrap();
        }
        weather_service.delete_city(austin.id).await.unwrap();
        weather_service.delete_state("TX").await.unwrap();
        assert!(weather_service.get_states_list().await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_rename_state_moves_cities(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let austin = weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        let renamed = weather_service.update_state("TX", StateUpdateInputType { abbrev: Some("TE".to_string()), name: None }).await.unwrap();
        assert_eq!(renamed, StateType { abbrev: "TE".to_string(), name: "Texas".to_string() });
        let cities = weather_service.get_cities_list().await.unwrap();
        assert_eq!(cities, vec![CityListElementType { id: austin.id, city: "Austin".to_string(), state: "Texas".to_string() }]);
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_partial_city_update(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let austin = weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        let updated = weather_service.update_city(austin.id, CityUpdateInputType { name: None, climate: Some("semi-arid".to_string()) }).await.unwrap();
        assert_eq!(updated.name, "Austin");
        assert_eq!(updated.climate, "semi-arid");
        assert_eq!(updated.state_abbrev, "TX");
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_temperature_for_unknown_city(pool: PgPool) {
        let weather_service = service(pool);
        let err = weather_service.add_temperature(temperature(999, 10, 1)).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::ForeignKeyViolation);
        assert_eq!(err.message, "The city does not exist");
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_rename_city_to_existing_name(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        let dallas = weather_service.add_city(city("TX", "Dallas", "humid subtropical")).await.unwrap();
        let err = weather_service.update_city(dallas.id, CityUpdateInputType { name: Some("Austin".to_string()), climate: None }).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::UniqueViolation);
        assert_eq!(err.message, "The city already exists");
        let cities = weather_service.get_cities_list().await.unwrap();
        assert_eq!(cities[1].city, "Dallas");
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_change_state_to_existing_abbrev(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("AZ", "Arizona")).await.unwrap();
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let err = weather_service.update_state("TX", StateUpdateInputType { abbrev: Some("AZ".to_string()), name: None }).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::UniqueViolation);
        assert_eq!(err.message, "The state already exists");
        assert_eq!(weather_service.get_state("TX").await.unwrap().name, "Texas");
        assert_eq!(weather_service.get_state("AZ").await.unwrap().name, "Arizona");
    }

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_temperature_out_of_range(pool: PgPool) {
        let weather_service = service(pool);
        weather_service.add_state(state("TX", "Texas")).await.unwrap();
        let austin = weather_service.add_city(city("TX", "Austin", "humid subtropical")).await.unwrap();
        let err = weather_service.add_temperature(temperature(austin.id, 100_000, 1)).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Validation);
        assert_eq!(err.message, "Value out of range");
        let reading = weather_service.add_temperature(temperature(austin.id, 20, 1)).await.unwrap();
        let err = weather_service.update_temperature(reading[0].id, TemperatureUpdateInputType { temperature: Decimal::from(-100_000) }).await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Validation);
        assert_eq!(err.message, "Value out of range");
    }
}
