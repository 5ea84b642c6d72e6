use crate::service::weather::WeatherService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The weather service for handling state, city and temperature operations.
     */
    pub weather_service: WeatherService,
}

impl AppState {
    /**
     * Creates a new instance of `AppState`.
     *
     * # Arguments
     * `weather_service`: The weather service shared by all handlers.
     */
    pub fn new(weather_service: WeatherService) -> Self {
        AppState { weather_service }
    }
}
