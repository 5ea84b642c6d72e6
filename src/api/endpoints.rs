use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{
            CityAddRequest, CityAverageResponse, CityListElement, CityResponse, CityUpdateRequest, ClimateAverageResponse, StateAddRequest, StateResponse, StateUpdateRequest, TemperatureAddRequest,
            TemperatureResponse, TemperatureUpdateRequest,
        },
        state::AppState,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{CityAddInputType, CityUpdateInputType, StateAddInputType, StateUpdateInputType, TemperatureAddInputType, TemperatureUpdateInputType},
    },
};

/**
 * Registers every endpoint together with the extractor configuration.
 * Malformed bodies and path parameters are answered as validation errors.
 */
pub fn configure_services(config: &mut web::ServiceConfig) {
    config
        .app_data(web::JsonConfig::default().error_handler(|err, _request| ApplicationError::new(ErrorType::Validation, format!("Invalid request body: {err}")).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _request| ApplicationError::new(ErrorType::Validation, format!("Invalid path parameter: {err}")).into()))
        .service(list_states)
        .service(get_state)
        .service(add_state)
        .service(update_state)
        .service(delete_state)
        .service(list_cities)
        .service(get_city_average)
        .service(add_city)
        .service(update_city)
        .service(delete_city)
        .service(add_temperature)
        .service(get_climate_average)
        .service(update_temperature)
        .service(delete_temperature);
}

/***************** States *********************/

/**
 * Endpoint to retrieve every state.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "listStates", trace_id = get_trace_id(&http_request)))]
#[get("/states")]
pub async fn list_states(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let states = app_state.weather_service.get_states_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(states.into_iter().map(StateResponse::from).collect::<Vec<_>>()))
}

/**
 * Endpoint to retrieve a state by abbreviation.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "getState", trace_id = get_trace_id(&http_request)))]
#[get("/states/{abbrev}")]
pub async fn get_state(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let abbrev = path.into_inner();
    let state = app_state.weather_service.get_state(&abbrev).instrument(span).await?;
    Ok(HttpResponse::Ok().json(StateResponse::from(state)))
}

/**
 * Add a new state.
 */
#[instrument(level = "info", skip(http_request, app_state), fields(service = "addState", trace_id = get_trace_id(&http_request)))]
#[post("/states")]
pub async fn add_state(http_request: HttpRequest, request_body: web::Json<StateAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let state_add_input = StateAddInputType::try_from(request_body.into_inner())?;
    let state = app_state.weather_service.add_state(state_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(StateResponse::from(state)))
}

/**
 * Update a state. Both abbreviation and name may change.
 */
#[instrument(skip(http_request, app_state), fields(service = "updateState", trace_id = get_trace_id(&http_request)))]
#[put("/states/{abbrev}")]
pub async fn update_state(path: Path<String>, http_request: HttpRequest, request_body: web::Json<StateUpdateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let abbrev = path.into_inner();
    let state_update_input = StateUpdateInputType::try_from(request_body.into_inner())?;
    let state = app_state.weather_service.update_state(&abbrev, state_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(StateResponse::from(state)))
}

/**
 * Delete a state.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteState", trace_id = get_trace_id(&http_request)))]
#[delete("/states/{abbrev}")]
pub async fn delete_state(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let abbrev = path.into_inner();
    app_state.weather_service.delete_state(&abbrev).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Cities *********************/

/**
 * Endpoint to retrieve every city with the name of its state.
 */
#[instrument(skip(http_request, app_state), fields(service = "listCities", trace_id = get_trace_id(&http_request)))]
#[get("/cities")]
pub async fn list_cities(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let cities = app_state.weather_service.get_cities_list().instrument(span).await?;
    Ok(HttpResponse::Ok().json(cities.into_iter().map(CityListElement::from).collect::<Vec<_>>()))
}

/**
 * Endpoint to retrieve a city name with its average temperature.
 */
#[instrument(skip(http_request, app_state), fields(service = "getCityAverage", trace_id = get_trace_id(&http_request)))]
#[get("/cities/{cityId}")]
pub async fn get_city_average(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city_id = path.into_inner();
    let average = app_state.weather_service.get_city_average(city_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CityAverageResponse::from(average)))
}

/**
 * Add a new city.
 */
#[instrument(skip(http_request, app_state), fields(service = "addCity", trace_id = get_trace_id(&http_request)))]
#[post("/cities")]
pub async fn add_city(http_request: HttpRequest, request_body: web::Json<CityAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city_add_input = CityAddInputType::try_from(request_body.into_inner())?;
    let city = app_state.weather_service.add_city(city_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(CityResponse::from(city)))
}

/**
 * Update name and/or climate of a city.
 */
#[instrument(skip(http_request, app_state), fields(service = "updateCity", trace_id = get_trace_id(&http_request)))]
#[put("/cities/{cityId}")]
pub async fn update_city(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<CityUpdateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city_id = path.into_inner();
    let city_update_input = CityUpdateInputType::try_from(request_body.into_inner())?;
    let city = app_state.weather_service.update_city(city_id, city_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CityResponse::from(city)))
}

/**
 * Delete a city.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteCity", trace_id = get_trace_id(&http_request)))]
#[delete("/cities/{cityId}")]
pub async fn delete_city(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let city_id = path.into_inner();
    app_state.weather_service.delete_city(city_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/***************** Temperatures *********************/

/**
 * Add a temperature reading. Responds with every reading of that city.
 */
#[instrument(skip(http_request, app_state), fields(service = "addTemperature", trace_id = get_trace_id(&http_request)))]
#[post("/temperatures")]
pub async fn add_temperature(http_request: HttpRequest, request_body: web::Json<TemperatureAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let temperature_add_input = TemperatureAddInputType::try_from(request_body.into_inner())?;
    let temperatures = app_state.weather_service.add_temperature(temperature_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(temperatures.into_iter().map(TemperatureResponse::from).collect::<Vec<_>>()))
}

/**
 * Endpoint to retrieve the average temperature for a climate.
 */
#[instrument(skip(http_request, app_state), fields(service = "getClimateAverage", trace_id = get_trace_id(&http_request)))]
#[get("/temperatures/{climate}")]
pub async fn get_climate_average(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let climate = path.into_inner();
    let average = app_state.weather_service.get_climate_average(&climate).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ClimateAverageResponse::from(average)))
}

/**
 * Update the value of a temperature reading.
 */
#[instrument(skip(http_request, app_state), fields(service = "updateTemperature", trace_id = get_trace_id(&http_request)))]
#[put("/temperatures/{temperatureId}")]
pub async fn update_temperature(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<TemperatureUpdateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let temperature_id = path.into_inner();
    let temperature_update_input = TemperatureUpdateInputType::try_from(request_body.into_inner())?;
    let temperature = app_state.weather_service.update_temperature(temperature_id, temperature_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(TemperatureResponse::from(temperature)))
}

/**
 * Delete a temperature reading.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteTemperature", trace_id = get_trace_id(&http_request)))]
#[delete("/temperatures/{temperatureId}")]
pub async fn delete_temperature(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let temperature_id = path.into_inner();
    app_state.weather_service.delete_temperature(temperature_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use actix_web::{App, http::StatusCode, test::{self, TestRequest}};
    use serde_json::json;
    use sqlx::PgPool;

    use super::*;
    use crate::{dao::weather::WeatherDao, service::weather::WeatherService};

    #[sqlx::test(migrations = "./sqlx-postgresql-migration/migrations")]
    async fn test_full_lifecycle(pool: PgPool) {
        let app_state = web::Data::new(AppState::new(WeatherService::new(WeatherDao::new(), Some(pool))));
        let app = test::init_service(App::new().app_data(app_state).configure(configure_services)).await;

        let response = test::call_service(&app, TestRequest::post().uri("/states").set_json(json!({"abbrev": "TX", "name": "Texas"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let state: StateResponse = test::read_body_json(response).await;
        assert_eq!(state, StateResponse { abbrev: "TX".to_string(), name: "Texas".to_string() });

        let response = test::call_service(&app, TestRequest::post().uri("/states").set_json(json!({"abbrev": "TX", "name": "Other"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(response).await, "The state already exists");

        let response = test::call_service(&app, TestRequest::get().uri("/states/ZZ").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(test::read_body(response).await, "State was not found");

        let response = test::call_service(&app, TestRequest::post().uri("/cities").set_json(json!({"state_abbrev": "ZZ", "name": "Nowhere", "climate": "arid"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(response).await, "The state does not exist");

        let response = test::call_service(&app, TestRequest::post().uri("/cities").set_json(json!({"state_abbrev": "TX", "name": "El Paso", "climate": "arid"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let city: CityResponse = test::read_body_json(response).await;
        assert_eq!(city.state_abbrev, "TX");
        assert_eq!(city.climate, "arid");

        let cities: Vec<CityListElement> = test::call_and_read_body_json(&app, TestRequest::get().uri("/cities").to_request()).await;
        assert_eq!(cities, vec![CityListElement { id: city.id, city: "El Paso".to_string(), state: "Texas".to_string() }]);

        let mut readings: Vec<TemperatureResponse> = Vec::new();
        for (value, date) in [(10, "2024-05-01"), (20, "2024-05-02"), (30, "2024-05-03")] {
            let response = test::call_service(&app, TestRequest::post().uri("/temperatures").set_json(json!({"city_id": city.id, "temperature": value, "date": date})).to_request()).await;
            assert_eq!(response.status(), StatusCode::CREATED);
            readings = test::read_body_json(response).await;
        }
        assert_eq!(readings.len(), 3);

        let response = test::call_service(&app, TestRequest::post().uri("/temperatures").set_json(json!({"city_id": city.id, "temperature": 99, "date": "2024-05-01"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(response).await, "The temperature already exists for that day in this city.");

        let response = test::call_service(&app, TestRequest::post().uri("/temperatures").set_json(json!({"city_id": 999999, "temperature": 15, "date": "2024-05-04"})).to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(response).await, "The city does not exist");

        let average: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri(&format!("/cities/{}", city.id)).to_request()).await;
        assert_eq!(average, json!({"name": "El Paso", "avg": 20.0}));

        let average: serde_json::Value = test::call_and_read_body_json(&app, TestRequest::get().uri("/temperatures/arid").to_request()).await;
        assert_eq!(average, json!({"climate": "arid", "avg": 20.0}));

        let response = test::call_service(&app, TestRequest::get().uri("/temperatures/polar").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test::call_service(&app, TestRequest::put().uri(&format!("/temperatures/{}", readings[0].id)).set_json(json!({"temperature": 12.5})).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: TemperatureResponse = test::read_body_json(response).await;
        assert_eq!(updated.temperature, rust_decimal::Decimal::new(125, 1));

        let response = test::call_service(&app, TestRequest::put().uri("/temperatures/999999").set_json(json!({"temperature": 1})).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = test::call_service(&app, TestRequest::delete().uri("/states/TX").to_request()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(test::read_body(response).await, "The state still has cities");

        for reading in &readings {
            let response = test::call_service(&app, TestRequest::delete().uri(&format!("/temperatures/{}", reading.id)).to_request()).await;
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert!(test::read_body(response).await.is_empty());
        }

        let response = test::call_service(&app, TestRequest::delete().uri(&format!("/cities/{}", city.id)).to_request()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = test::call_service(&app, TestRequest::delete().uri(&format!("/cities/{}", city.id)).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(test::read_body(response).await, "City not found");

        let response = test::call_service(&app, TestRequest::put().uri("/states/TX").set_json(json!({"name": "Lone Star"})).to_request()).await;
        let state: StateResponse = test::read_body_json(response).await;
        assert_eq!(state.name, "Lone Star");

        let response = test::call_service(&app, TestRequest::delete().uri("/states/TX").to_request()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let states: Vec<StateResponse> = test::call_and_read_body_json(&app, TestRequest::get().uri("/states").to_request()).await;
        assert!(states.is_empty());
    }
}
