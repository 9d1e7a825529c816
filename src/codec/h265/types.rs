use bytes::Bytes;

/// H.265 NAL unit types (ITU-T H.265 table 7-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    TrailN,
    TrailR,
    TsaN,
    TsaR,
    StsaN,
    StsaR,
    RadlN,
    RadlR,
    RaslN,
    RaslR,
    BlaWLp,
    BlaWRadl,
    BlaNLp,
    IdrWRadl,
    IdrNLp,
    CraNut,
    /// Reserved VCL types (10..=15, 22..=31)
    ReservedVcl(u8),
    Vps,
    Sps,
    Pps,
    Aud,
    Eos,
    Eob,
    Fd,
    PrefixSei,
    SuffixSei,
    Unspecified(u8),
}

impl NALUnitType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => NALUnitType::TrailN,
            1 => NALUnitType::TrailR,
            2 => NALUnitType::TsaN,
            3 => NALUnitType::TsaR,
            4 => NALUnitType::StsaN,
            5 => NALUnitType::StsaR,
            6 => NALUnitType::RadlN,
            7 => NALUnitType::RadlR,
            8 => NALUnitType::RaslN,
            9 => NALUnitType::RaslR,
            16 => NALUnitType::BlaWLp,
            17 => NALUnitType::BlaWRadl,
            18 => NALUnitType::BlaNLp,
            19 => NALUnitType::IdrWRadl,
            20 => NALUnitType::IdrNLp,
            21 => NALUnitType::CraNut,
            10..=15 | 22..=31 => NALUnitType::ReservedVcl(value),
            32 => NALUnitType::Vps,
            33 => NALUnitType::Sps,
            34 => NALUnitType::Pps,
            35 => NALUnitType::Aud,
            36 => NALUnitType::Eos,
            37 => NALUnitType::Eob,
            38 => NALUnitType::Fd,
            39 => NALUnitType::PrefixSei,
            40 => NALUnitType::SuffixSei,
            _ => NALUnitType::Unspecified(value),
        }
    }

    /// Picture-carrying unit.
    pub fn is_vcl(&self) -> bool {
        !matches!(
            self,
            NALUnitType::Vps
                | NALUnitType::Sps
                | NALUnitType::Pps
                | NALUnitType::Aud
                | NALUnitType::Eos
                | NALUnitType::Eob
                | NALUnitType::Fd
                | NALUnitType::PrefixSei
                | NALUnitType::SuffixSei
                | NALUnitType::Unspecified(_)
        )
    }

    /// Intra random access point picture (BLA, IDR or CRA).
    pub fn is_irap(&self) -> bool {
        matches!(
            self,
            NALUnitType::BlaWLp
                | NALUnitType::BlaWRadl
                | NALUnitType::BlaNLp
                | NALUnitType::IdrWRadl
                | NALUnitType::IdrNLp
                | NALUnitType::CraNut
        )
    }

    /// Parameter sets or an IRAP picture.
    pub fn is_sync_point(&self) -> bool {
        self.is_irap() || matches!(self, NALUnitType::Vps | NALUnitType::Sps | NALUnitType::Pps)
    }
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

/// An H.265 NAL unit without its start code.
#[derive(Debug, Clone)]
pub struct NALUnit {
    pub nal_type: NALUnitType,
    /// `nuh_temporal_id_plus1 - 1`
    pub temporal_id: u8,
    pub data: Bytes,
}

impl NALUnit {
    /// Wraps `data`, which must start at the two-byte NAL header. Returns
    /// `None` when the header is incomplete.
    pub fn new(data: Bytes) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }
        Some(NALUnit {
            nal_type: NALUnitType::from_u8(super::nal_type(data[0])),
            temporal_id: (data[1] & 0x07).saturating_sub(1),
            data,
        })
    }
}
