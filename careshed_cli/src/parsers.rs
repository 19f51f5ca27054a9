use careshed_matrix_providers::route_matrix_provider::TravelMode;

pub fn parse_mode(input: &str) -> Result<TravelMode, String> {
    input.parse()
}

pub fn parse_timestamp(input: &str) -> Result<jiff::Timestamp, String> {
    input
        .parse::<jiff::Timestamp>()
        .map_err(|err| err.to_string())
}
