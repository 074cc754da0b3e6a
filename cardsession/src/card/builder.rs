use crate::protocol::Fci;
use crate::types::{CardProtocol, SerialNumber, Sfi};

/// Builder for [`Card`](crate::card::Card), fed by the selection service.
#[derive(Debug, Default)]
pub struct CardBuilder {
    serial_number: Option<SerialNumber>,
    df_name: Option<Vec<u8>>,
    startup_info: Option<Vec<u8>>,
    protocol: Option<CardProtocol>,
    counter_widths: Vec<(Sfi, usize)>,
}

impl CardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take identity fields from a decoded FCI.
    pub fn fci(mut self, fci: Fci) -> Self {
        self.serial_number = Some(fci.serial_number);
        self.df_name = Some(fci.df_name);
        self.startup_info = fci.startup_info;
        self
    }

    pub fn serial_number(mut self, serial: SerialNumber) -> Self {
        self.serial_number = Some(serial);
        self
    }

    pub fn df_name(mut self, df_name: &[u8]) -> Self {
        self.df_name = Some(df_name.to_vec());
        self
    }

    pub fn protocol(mut self, protocol: Option<CardProtocol>) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn counter_width(mut self, sfi: Sfi, width: usize) -> Self {
        self.counter_widths.push((sfi, width));
        self
    }

    /// Serial number and DF name are required.
    pub fn build(self) -> crate::Result<crate::card::Card> {
        let serial_number = self.serial_number.ok_or(crate::Error::InvalidLength {
            expected: 8,
            actual: 0,
        })?;
        let df_name = self
            .df_name
            .ok_or_else(|| crate::Error::MalformedResponse("card without DF name".into()))?;

        let mut card = crate::card::Card::new(serial_number, df_name, self.protocol);
        card.set_startup_info(self.startup_info);
        for (sfi, width) in self.counter_widths {
            card.file_mut(sfi).set_counter_width(width);
        }
        Ok(card)
    }
}
