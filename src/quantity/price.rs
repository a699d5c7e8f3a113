quantity!(
    /// Unit price per kilowatt-hour in the configured currency.
    KilowattHourPrice, suffix: "/kWh", precision: 4
);
