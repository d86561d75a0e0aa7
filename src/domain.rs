mod city;
mod email_address;
mod frequency;
mod subscription;
mod weather;

pub use city::City;
pub use email_address::EmailAddress;
pub use frequency::Frequency;
pub use subscription::{NewSubscription, Subscription};
pub use weather::{Coordinates, WeatherReading};
