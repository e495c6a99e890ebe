use esp_idf_svc::sys::{esp, EspError};
use sensor_reporter_common::PairedSensor;

/// Bit-banged DHT22 driver on a raw esp-idf GPIO.
///
/// Every acquisition is a fresh bus transaction. Wrap it in
/// `sensor_reporter_common::Paired` to read humidity and temperature from
/// the same one.
pub struct DHT22 {
    pin: i32,
}

#[derive(Clone, Copy, Debug)]
pub enum DHT22Error {
    ChecksumError,
    TimeoutError,
    GpioError(EspError),
}

impl DHT22 {
    const MAX_DHT_DATA: usize = 5;

    pub fn new(pin: i32) -> Self {
        Self { pin }
    }

    fn get_signal_level(&self, max_wait: i32, state: i32) -> i32 {
        use esp_idf_svc::sys::*;

        let mut u_sec: i32 = 0;
        unsafe {
            while gpio_get_level(self.pin) == state {
                u_sec += 1;
                if u_sec > max_wait {
                    return -1;
                }
                ets_delay_us(1);
            }
        }

        u_sec
    }

    /// Runs one acquisition, returning `(temperature, humidity)`.
    fn read(&self) -> Result<(f32, f32), DHT22Error> {
        use esp_idf_svc::sys::*;

        let mut dht_data = [0u8; Self::MAX_DHT_DATA];
        let mut byte_inx = 0;
        let mut bit_inx = 7;

        unsafe {
            esp!(gpio_set_direction(self.pin, GPIO_MODE_DEF_OUTPUT)).map_err(DHT22Error::GpioError)?;

            // pull down for 3 ms to wake the sensor up
            gpio_set_level(self.pin, 0);
            ets_delay_us(3000);

            // pull up for 25 us to ask for data
            gpio_set_level(self.pin, 1);
            ets_delay_us(25);

            esp!(gpio_set_direction(self.pin, GPIO_MODE_DEF_INPUT)).map_err(DHT22Error::GpioError)?;

            // the sensor answers with 80 us low, then 80 us high
            if self.get_signal_level(85, 0) < 0 {
                return Err(DHT22Error::TimeoutError);
            }
            if self.get_signal_level(85, 1) < 0 {
                return Err(DHT22Error::TimeoutError);
            }

            for _ in 0..40 {
                // every bit starts with >50 us low
                if self.get_signal_level(56, 0) < 0 {
                    return Err(DHT22Error::TimeoutError);
                }

                // a high phase longer than ~28 us is a "1"
                let u_sec = self.get_signal_level(75, 1);
                if u_sec < 0 {
                    return Err(DHT22Error::TimeoutError);
                }
                if u_sec > 40 {
                    dht_data[byte_inx] |= 1 << bit_inx;
                }

                if bit_inx == 0 {
                    bit_inx = 7;
                    byte_inx += 1;
                } else {
                    bit_inx -= 1;
                }
            }
        }

        let checksum = dht_data[..4]
            .iter()
            .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
        if dht_data[4] != checksum {
            return Err(DHT22Error::ChecksumError);
        }

        let humidity = u16::from_be_bytes([dht_data[0], dht_data[1]]) as f32 / 10.0;

        let mut temperature =
            u16::from_be_bytes([dht_data[2] & 0x7F, dht_data[3]]) as f32 / 10.0;
        if dht_data[2] & 0x80 != 0 {
            temperature = -temperature;
        }

        Ok((temperature, humidity))
    }
}

impl PairedSensor for DHT22 {
    type Error = DHT22Error;

    fn begin(&mut self) -> Result<(), Self::Error> {
        use esp_idf_svc::sys::*;

        unsafe {
            esp!(gpio_reset_pin(self.pin)).map_err(DHT22Error::GpioError)?;
            esp!(gpio_set_pull_mode(self.pin, gpio_pull_mode_t_GPIO_PULLUP_ONLY))
                .map_err(DHT22Error::GpioError)?;
        }

        Ok(())
    }

    fn acquire(&mut self) -> Result<(f32, f32), Self::Error> {
        let result = self.read();
        if let Err(e) = &result {
            log::debug!("DHT22 read on GPIO{} failed: {e:?}", self.pin);
        }
        result
    }
}
