//! A simulated eID card speaking the card side of PACE and secure messaging
#![allow(dead_code, unreachable_pub, missing_docs)]

use std::collections::HashMap;

use apdu_core::{Bytes, CardTransport, Command, StatusWord, TransportError};
use eid_pace::constants::ID_PACE_ECDH_GM_AES_CBC_CMAC_256;
use eid_pace::crypto::{self, BLOCK_SIZE, Block};
use eid_pace::ec::{self, CurvePoint};
use eid_pace::{CardAccessInfo, SessionKeys, kdf, token};
use iso7816_tlv::ber::{Tag, Tlv, Value};
use p256::Scalar;
use rand::RngCore;

pub const CAN: &[u8] = b"123456";
pub const ESTEID_AID: [u8; 15] = [
    0xA0, 0x00, 0x00, 0x00, 0x77, 0x01, 0x08, 0x00, 0x07, 0x00, 0x00, 0xFE, 0x00, 0x00, 0x01,
];

const SW_OK: StatusWord = StatusWord::SUCCESS;
const SW_FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
const SW_NO_CURRENT_EF: StatusWord = StatusWord::new(0x69, 0x86);
const SW_WRONG_DATA: StatusWord = StatusWord::new(0x6A, 0x80);
const SW_CONDITIONS: StatusWord = StatusWord::new(0x69, 0x85);
const SW_SM_MISSING: StatusWord = StatusWord::new(0x69, 0x87);
const SW_SM_INCORRECT: StatusWord = StatusWord::new(0x69, 0x88);
const SW_SM_NOT_ACTIVE: StatusWord = StatusWord::new(0x68, 0x82);
const SW_AUTH_FAILED: StatusWord = StatusWord::new(0x63, 0xC2);
const SW_INS_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6D, 0x00);

/// Personal data file entries, 50 01 to 50 0F
pub const PERSONAL_DATA: [&str; 15] = [
    "JÕEORG",
    "JAAK-KRISTJAN",
    "M",
    "EST",
    "03.07.1978 EST",
    "37807030299",
    "AA0000000",
    "01.01.2030",
    "TALLINN",
    "01.01.2025",
    "PPA",
    "",
    "",
    "",
    "",
];

/// An EF whose protected response needs long-form BER lengths
pub const LARGE_FILE: [u8; 2] = [0x50, 0x10];

pub fn large_file_content() -> Vec<u8> {
    (0..200u32).map(|i| (i * 7) as u8).collect()
}

#[derive(Debug, Default)]
enum Handshake {
    #[default]
    Idle,
    AwaitingMapping {
        nonce: Scalar,
    },
    AwaitingKeyAgreement {
        generator: CurvePoint,
    },
    AwaitingToken {
        terminal_key: CurvePoint,
        card_key: CurvePoint,
        keys: SessionKeys,
    },
}

/// Card-side behaviour toggles for negative tests
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Send a wrong authentication token after verifying the terminal's
    pub corrupt_card_token: bool,
    /// Flip this bit of the next protected response (bit index over the response bytes)
    pub flip_response_bit: Option<usize>,
    /// Echo the terminal's mapping key back instead of a fresh one
    pub echo_mapping_key: bool,
}

#[derive(Debug)]
pub struct SimulatedCard {
    password: Vec<u8>,
    files: HashMap<[u8; 2], Option<Vec<u8>>>,
    selected: Option<[u8; 2]>,
    protocol: Vec<u8>,
    handshake: Handshake,
    session: Option<SessionKeys>,
    ssc: u64,
    pub faults: Faults,
    pub commands: Vec<Vec<u8>>,
}

impl SimulatedCard {
    pub fn new(password: &[u8]) -> Self {
        let card_access = CardAccessInfo::pace_ecdh_gm_aes256_p256()
            .to_der()
            .expect("encode card access");
        Self::with_card_access(password, card_access)
    }

    pub fn with_card_access(password: &[u8], card_access: Vec<u8>) -> Self {
        let mut files = HashMap::new();
        files.insert([0x01, 0x1C], Some(card_access));
        files.insert([0x50, 0x00], None);
        for (i, entry) in PERSONAL_DATA.iter().enumerate() {
            files.insert([0x50, i as u8 + 1], Some(entry.as_bytes().to_vec()));
        }
        files.insert(LARGE_FILE, Some(large_file_content()));

        Self {
            password: password.to_vec(),
            files,
            selected: None,
            protocol: ID_PACE_ECDH_GM_AES_CBC_CMAC_256.to_vec(),
            handshake: Handshake::Idle,
            session: None,
            ssc: 0,
            faults: Faults::default(),
            commands: Vec::new(),
        }
    }

    /// Session keys once the card has accepted the terminal's token
    pub fn session_keys(&self) -> Option<&SessionKeys> {
        self.session.as_ref()
    }

    pub fn send_sequence_counter(&self) -> u64 {
        self.ssc
    }

    pub fn in_secure_messaging(&self) -> bool {
        self.session.is_some()
    }

    fn respond(data: &[u8], status: StatusWord) -> Bytes {
        let mut response = data.to_vec();
        response.extend_from_slice(&[status.sw1, status.sw2]);
        Bytes::from(response)
    }

    fn process_plain(&mut self, command: &Command) -> (Vec<u8>, StatusWord) {
        match (command.cla & 0xF3, command.ins, command.p1, command.p2) {
            (0x00, 0xA4, 0x04, 0x00) => match command.data() {
                Some(aid) if aid == ESTEID_AID.as_slice() => (Vec::new(), SW_OK),
                _ => (Vec::new(), SW_FILE_NOT_FOUND),
            },
            (0x00, 0xA4, 0x01, 0x0C) => match command.data() {
                Some(&[hi, lo]) if self.files.contains_key(&[hi, lo]) => {
                    self.selected = Some([hi, lo]);
                    (Vec::new(), SW_OK)
                }
                _ => (Vec::new(), SW_FILE_NOT_FOUND),
            },
            (0x00, 0xB0, 0x00, 0x00) => match self.selected.and_then(|fid| self.files.get(&fid)) {
                Some(Some(content)) => (content.clone(), SW_OK),
                _ => (Vec::new(), SW_NO_CURRENT_EF),
            },
            (0x00, 0x22, 0xC1, 0xA4) => self.set_at(command.data().unwrap_or_default()),
            (0x00 | 0x10, 0x86, 0x00, 0x00) => {
                self.general_authenticate(command.data().unwrap_or_default())
            }
            _ => (Vec::new(), SW_INS_NOT_SUPPORTED),
        }
    }

    fn set_at(&mut self, data: &[u8]) -> (Vec<u8>, StatusWord) {
        let mut expected = primitive(0x80, self.protocol.clone());
        expected.extend(primitive(0x83, vec![0x02]));
        if data != expected {
            return (Vec::new(), SW_WRONG_DATA);
        }
        self.handshake = Handshake::Idle;
        self.session = None;
        (Vec::new(), SW_OK)
    }

    fn general_authenticate(&mut self, data: &[u8]) -> (Vec<u8>, StatusWord) {
        let Some((tag, value)) = parse_dynamic_authentication_data(data) else {
            return (Vec::new(), SW_WRONG_DATA);
        };

        match (std::mem::take(&mut self.handshake), tag) {
            (Handshake::Idle, None) => {
                let mut nonce = [0u8; 16];
                rand::rng().fill_bytes(&mut nonce);
                let key = kdf::password_key(&self.password);
                let encrypted =
                    crypto::aes_cbc_encrypt(key.as_slice(), &[0u8; BLOCK_SIZE], &nonce).unwrap();

                self.handshake = Handshake::AwaitingMapping {
                    nonce: ec::scalar_from_bytes(&nonce).unwrap(),
                };
                (dynamic_authentication_data(0x80, &encrypted), SW_OK)
            }
            (Handshake::AwaitingMapping { nonce }, Some(0x81)) => {
                let Ok(terminal_key) = ec::decode_point(&value) else {
                    return (Vec::new(), SW_WRONG_DATA);
                };
                let secret = ec::random_scalar();
                let card_key = if self.faults.echo_mapping_key {
                    terminal_key
                } else {
                    ec::scalar_base_multiply(&secret).unwrap()
                };
                let shared = ec::scalar_multiply(&terminal_key, &secret).unwrap();
                let generator =
                    ec::add_points(&ec::scalar_base_multiply(&nonce).unwrap(), &shared).unwrap();

                self.handshake = Handshake::AwaitingKeyAgreement { generator };
                (dynamic_authentication_data(0x82, &card_key.encode()), SW_OK)
            }
            (Handshake::AwaitingKeyAgreement { generator }, Some(0x83)) => {
                let Ok(terminal_key) = ec::decode_point(&value) else {
                    return (Vec::new(), SW_WRONG_DATA);
                };
                let secret = ec::random_scalar();
                let card_key = ec::scalar_multiply(&generator, &secret).unwrap();
                let shared = ec::scalar_multiply(&terminal_key, &secret).unwrap();

                self.handshake = Handshake::AwaitingToken {
                    terminal_key,
                    card_key,
                    keys: SessionKeys::derive(&shared.x()),
                };
                (dynamic_authentication_data(0x84, &card_key.encode()), SW_OK)
            }
            (
                Handshake::AwaitingToken {
                    terminal_key,
                    card_key,
                    keys,
                },
                Some(0x85),
            ) => {
                if token::verify_token(keys.mac(), &self.protocol, &card_key, &value).is_err() {
                    return (Vec::new(), SW_AUTH_FAILED);
                }
                let mut card_token =
                    token::compute_token(keys.mac(), &self.protocol, &terminal_key).unwrap();
                if self.faults.corrupt_card_token {
                    card_token[0] ^= 0xFF;
                }

                self.session = Some(keys);
                self.ssc = 0;
                (dynamic_authentication_data(0x86, &card_token), SW_OK)
            }
            _ => (Vec::new(), SW_CONDITIONS),
        }
    }

    fn ssc_block(&self) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        block[8..].copy_from_slice(&self.ssc.to_be_bytes());
        block
    }

    /// Handle a protected command; `None` means the card drops secure messaging
    fn process_protected(&mut self, command: &Command) -> Option<Bytes> {
        let keys = self.session.clone()?;
        self.ssc += 1;

        let body = command.data()?;
        let mut objects = Vec::new();
        let mut remaining = body;
        while !remaining.is_empty() {
            let (tlv, rest) = Tlv::parse(remaining);
            let tlv = tlv.ok()?;
            let Value::Primitive(value) = tlv.value() else {
                return None;
            };
            objects.push((tlv.tag().to_bytes()[0], value.clone(), tlv.to_vec()));
            remaining = rest;
        }

        let (mac_objects, mac) = match objects.split_last() {
            Some(((0x8E, mac, _), rest)) => (rest, mac.clone()),
            _ => return None,
        };

        let mut mac_input = self.ssc_block().to_vec();
        mac_input.extend(crypto::pad(&command.header()));
        for (_, _, encoded) in mac_objects {
            mac_input.extend_from_slice(encoded);
        }
        if !crypto::verify_cmac8(keys.mac(), &crypto::pad(&mac_input), &mac).ok()? {
            return None;
        }

        let iv = crypto::aes_ecb_encrypt_block(keys.enc(), &self.ssc_block()).ok()?;
        let mut plain = Command::new(command.cla & !0x0C, command.ins, command.p1, command.p2);
        for (tag, value, _) in mac_objects {
            match tag {
                0x87 => {
                    let decrypted = crypto::aes_cbc_decrypt(keys.enc(), &iv, &value[1..]).ok()?;
                    plain = plain.with_data(crypto::unpad(&decrypted).ok()?.to_vec());
                }
                0x97 => plain = plain.with_le(value[0]),
                _ => return None,
            }
        }

        let (data, status) = self.process_plain(&plain);

        self.ssc += 1;
        let mut response = Vec::new();
        if !data.is_empty() {
            let iv = crypto::aes_ecb_encrypt_block(keys.enc(), &self.ssc_block()).ok()?;
            let cryptogram = crypto::aes_cbc_encrypt(keys.enc(), &iv, &crypto::pad(&data)).ok()?;
            let mut value = vec![0x01];
            value.extend(cryptogram);
            response.extend(primitive(0x87, value));
        }
        response.extend(primitive(0x99, vec![status.sw1, status.sw2]));

        let mut mac_input = self.ssc_block().to_vec();
        mac_input.extend_from_slice(&response);
        let mac = crypto::cmac8(keys.mac(), &crypto::pad(&mac_input)).ok()?;
        response.extend(primitive(0x8E, mac.to_vec()));

        let mut response = Self::respond(&response, status).to_vec();
        if let Some(bit) = self.faults.flip_response_bit.take() {
            response[bit / 8] ^= 1 << (bit % 8);
        }
        Some(Bytes::from(response))
    }
}

impl CardTransport for SimulatedCard {
    type Error = TransportError;

    fn do_transmit_raw(&mut self, raw: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(raw.to_vec());
        let command = Command::from_bytes(raw)?;

        if self.session.is_some() {
            if command.cla & 0x0C != 0x0C {
                self.session = None;
                return Ok(Self::respond(&[], SW_SM_MISSING));
            }
            return Ok(match self.process_protected(&command) {
                Some(response) => response,
                None => {
                    self.session = None;
                    Self::respond(&[], SW_SM_INCORRECT)
                }
            });
        }

        if command.cla & 0x0C == 0x0C {
            return Ok(Self::respond(&[], SW_SM_NOT_ACTIVE));
        }
        let (data, status) = self.process_plain(&command);
        Ok(Self::respond(&data, status))
    }
}

fn primitive(tag: u8, value: Vec<u8>) -> Vec<u8> {
    let tag = Tag::try_from(tag).expect("primitive tag");
    Tlv::new(tag, Value::Primitive(value))
        .expect("primitive object")
        .to_vec()
}

/// `7C { tag value }`
fn dynamic_authentication_data(tag: u8, value: &[u8]) -> Vec<u8> {
    let inner = Tlv::new(
        Tag::try_from(tag).expect("inner tag"),
        Value::Primitive(value.to_vec()),
    )
    .expect("inner object");
    Tlv::new(
        Tag::try_from(0x7Cu8).expect("outer tag"),
        Value::Constructed(vec![inner]),
    )
    .expect("outer object")
    .to_vec()
}

/// Split `7C { tag value }` or `7C 00`
fn parse_dynamic_authentication_data(data: &[u8]) -> Option<(Option<u8>, Vec<u8>)> {
    let (outer, rest) = Tlv::parse(data);
    let outer = outer.ok()?;
    if !rest.is_empty() || outer.tag().to_bytes() != [0x7C].as_slice() {
        return None;
    }

    match outer.value() {
        Value::Primitive(value) if value.is_empty() => Some((None, Vec::new())),
        Value::Constructed(children) => match children.as_slice() {
            [] => Some((None, Vec::new())),
            [child] => match child.value() {
                Value::Primitive(value) => Some((Some(child.tag().to_bytes()[0]), value.clone())),
                Value::Constructed(_) => None,
            },
            _ => None,
        },
        Value::Primitive(_) => None,
    }
}
