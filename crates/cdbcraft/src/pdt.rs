//! SCSI peripheral device types (the 5-bit PDT field of INQUIRY data).

use std::fmt;

/// Device class tag. Only used to pick display names, never to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PeripheralType {
    #[default]
    Disk = 0x00,
    Tape = 0x01,
    Printer = 0x02,
    Processor = 0x03,
    WriteOnce = 0x04,
    Mmc = 0x05,
    Scanner = 0x06,
    Optical = 0x07,
    MediumChanger = 0x08,
    Comms = 0x09,
    Raid = 0x0c,
    Enclosure = 0x0d,
    SimpleDisk = 0x0e,
    OpticalCard = 0x0f,
    Bridge = 0x10,
    Osd = 0x11,
    Automation = 0x12,
    SecurityManager = 0x13,
    Zbc = 0x14,
    WellKnownLun = 0x1e,
    Unknown = 0x1f,
}

impl PeripheralType {
    /// Collapses a lesser used type onto the common type it shares its command set with,
    /// e.g. ZBC onto disk and ADC onto tape. Other types are returned unchanged.
    pub fn decay(self) -> Self {
        use PeripheralType::*;

        match self {
            Printer | Automation => Tape,
            WriteOnce | Optical | SimpleDisk | Zbc => Disk,
            other => other,
        }
    }

    fn description(self) -> &'static str {
        use PeripheralType::*;

        match self {
            Disk => "disk",
            Tape => "tape",
            Printer => "printer",
            Processor => "processor",
            WriteOnce => "write once optical disk",
            Mmc => "cd/dvd",
            Scanner => "scanner",
            Optical => "optical memory device",
            MediumChanger => "medium changer",
            Comms => "communications",
            Raid => "storage array controller",
            Enclosure => "enclosure services device",
            SimpleDisk => "simplified direct access device",
            OpticalCard => "optical card reader/writer device",
            Bridge => "bridge controller commands",
            Osd => "object based storage",
            Automation => "automation/drive interface",
            SecurityManager => "security manager device",
            Zbc => "host managed zoned block",
            WellKnownLun => "well known logical unit",
            Unknown => "unknown or no device type",
        }
    }
}

impl fmt::Display for PeripheralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl TryFrom<u8> for PeripheralType {
    type Error = u8;

    /// Fails with the raw value for reserved or out of range codes.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use PeripheralType::*;

        Ok(match value {
            0x00 => Disk,
            0x01 => Tape,
            0x02 => Printer,
            0x03 => Processor,
            0x04 => WriteOnce,
            0x05 => Mmc,
            0x06 => Scanner,
            0x07 => Optical,
            0x08 => MediumChanger,
            0x09 => Comms,
            0x0c => Raid,
            0x0d => Enclosure,
            0x0e => SimpleDisk,
            0x0f => OpticalCard,
            0x10 => Bridge,
            0x11 => Osd,
            0x12 => Automation,
            0x13 => SecurityManager,
            0x14 => Zbc,
            0x1e => WellKnownLun,
            0x1f => Unknown,
            other => return Err(other),
        })
    }
}
