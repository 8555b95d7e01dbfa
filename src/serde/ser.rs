use std::collections::HashMap;
use std::io::Write;

use serde::ser::{self, Serialize};

use byteorder::{BigEndian, WriteBytesExt};

use super::error::{Error, Result};
use super::EnumEncoding;

use named_type::NamedType;

use super::de::OpCodeEnum;

/// The Jute wire serializer, symmetric with [`super::de::Deserializer`].
///
/// Enum discriminants are recovered from the same `(type name -> discriminant table)`
/// mappings used on the read side, keyed by the variant's *name* rather than its
/// position so that a registered `OpCodeEnum` drives both directions.
pub struct Serializer<W> {
    writer: W,

    /// Struct enum type -> (enum variant name -> discriminant, encoding order)
    enum_mappings: HashMap<&'static str, (HashMap<&'static str, i32>, EnumEncoding)>,
}

pub fn to_writer<W: Write>(writer: W) -> Serializer<W> {
    Serializer {
        writer,
        enum_mappings: HashMap::new(),
    }
}

impl<W: Write> Serializer<W> {
    /// Add a discriminant mapping for struct enum types, mirroring
    /// `Deserializer::add_enum_mapping`.
    pub fn add_enum_mapping<E: OpCodeEnum, T: NamedType>(&mut self, order: EnumEncoding) {
        self.enum_mappings
            .insert(T::short_type_name(), (E::names_to_codes(), order));
    }

    /// Add mappings for a field-less enum.
    pub fn add_enum<E: OpCodeEnum + NamedType>(&mut self) {
        self.enum_mappings
            .insert(E::short_type_name(), (E::names_to_codes(), EnumEncoding::Type));
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<'a, W: Write> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = SeqSerializer<'a, W>;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = SeqSerializer<'a, W>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.writer.write_u8(if v { 1 } else { 0 })?;
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.writer.write_i8(v)?;
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Result<()> {
        // Jute only has 8, 32 & 64 bits integers; a 16-bit field is a struct definition
        // error, not a runtime one.
        unimplemented!()
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.writer.write_i32::<BigEndian>(v)?;
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.writer.write_i64::<BigEndian>(v)?;
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.writer.write_u8(v)?;
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Result<()> {
        unimplemented!()
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.writer.write_u32::<BigEndian>(v)?;
        Ok(())
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.writer.write_u64::<BigEndian>(v)?;
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.writer.write_f32::<BigEndian>(v)?;
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.writer.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    fn serialize_char(self, _v: char) -> Result<()> {
        unimplemented!()
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        let bytes = v.as_bytes();
        if bytes.len() > super::MAX_LENGTH {
            return Err(Error::TooLarge(bytes.len()));
        }
        self.writer.write_u32::<BigEndian>(bytes.len() as u32)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        // Called for Vec<u8> fields with serde(with = "serde_bytes")
        if v.len() > super::MAX_LENGTH {
            return Err(Error::TooLarge(v.len()));
        }
        self.writer.write_u32::<BigEndian>(v.len() as u32)?;
        self.writer.write_all(v)?;
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        unimplemented!()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> Result<()> {
        unimplemented!()
    }

    fn serialize_unit(self) -> Result<()> {
        unimplemented!()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        unimplemented!()
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, _variant: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.write_discriminant(name, variant)?;
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let len = len.ok_or_else(|| Error::Message("Sequence length must be known ahead of time".to_owned()))?;
        self.writer.write_i32::<BigEndian>(len as i32)?;
        Ok(SeqSerializer { ser: self })
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.write_discriminant(name, variant)?;
        Ok(self)
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        let len = len.ok_or_else(|| Error::Message("Map length must be known ahead of time".to_owned()))?;
        self.writer.write_i32::<BigEndian>(len as i32)?;
        Ok(SeqSerializer { ser: self })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.write_discriminant(name, variant)?;
        Ok(self)
    }
}

impl<W: Write> Serializer<W> {
    fn write_discriminant(&mut self, enum_type: &'static str, variant: &'static str) -> Result<()> {
        let (mappings, order) = self
            .enum_mappings
            .get(enum_type)
            .ok_or_else(|| Error::Message(format!("Cannot find mapping for type {}", enum_type)))?;

        let discriminant = *mappings
            .get(variant)
            .ok_or_else(|| Error::Message(format!("Wrong variant for {}: {}", enum_type, variant)))?;

        match order {
            EnumEncoding::Type => {
                self.writer.write_i32::<BigEndian>(discriminant)?;
            }
            EnumEncoding::LengthThenType => {
                // The length is patched in by the caller once the payload size is known
                // (see MultiTxnOperation handling in the txn module); here we only write
                // the discriminant, which is all a plain enum needs.
                self.writer.write_i32::<BigEndian>(discriminant)?;
            }
            EnumEncoding::TypeThenLength => {
                self.writer.write_i32::<BigEndian>(discriminant)?;
            }
        }
        Ok(())
    }
}

// Tuple / tuple-struct / tuple-variant / struct / struct-variant all just serialize their
// fields in order: Jute structs carry no field names or tags on the wire.

impl<'a, W: Write> ser::SerializeTuple for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, W: Write> ser::SerializeTupleStruct for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, W: Write> ser::SerializeTupleVariant for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, W: Write> ser::SerializeStruct for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, W: Write> ser::SerializeStructVariant for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Result<()> {
        value.serialize(&mut **self)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

pub struct SeqSerializer<'a, W> {
    ser: &'a mut Serializer<W>,
}

impl<'a, W: Write> ser::SerializeSeq for SeqSerializer<'a, W> {
    type Ok = ();
    type Error = Error;
    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.ser)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a, W: Write> ser::SerializeMap for SeqSerializer<'a, W> {
    type Ok = ();
    type Error = Error;
    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        key.serialize(&mut *self.ser)
    }
    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        value.serialize(&mut *self.ser)
    }
    fn end(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_derive::Serialize;

    #[derive(Serialize)]
    struct NewType(i32);

    #[derive(Serialize)]
    struct Foo {
        a: NewType,
        x: i32,
        y: String,
    }

    #[test]
    fn test_ser() {
        let foo = Foo {
            a: NewType(0x01020304),
            x: 0x05060708,
            y: "abcd".to_owned(),
        };

        let mut buf = Vec::new();
        {
            let mut ser = super::to_writer(&mut buf);
            foo.serialize(&mut ser).expect("Failed to serialize");
        }

        assert_eq!(
            buf,
            vec![
                0x01, 0x02, 0x03, 0x04, // i32
                0x05, 0x06, 0x07, 0x08, // i32
                0x00, 0x00, 0x00, 0x04, // string length
                0x61, 0x62, 0x63, 0x64, // "abcd"
            ]
        );
    }

    #[test]
    fn test_roundtrip_enum() {
        use crate::serde::de::OpCodeEnum;
        use crate::serde::EnumEncoding;
        use named_type::NamedType;
        use named_type_derive::NamedType;
        use num_derive::ToPrimitive;
        use serde::Deserialize;
        use strum_macros::{EnumIter, IntoStaticStr};

        #[derive(Debug, PartialEq, ToPrimitive, IntoStaticStr, EnumIter)]
        enum FooBarCode {
            Foo = 3,
            Bar = 4,
        }

        #[derive(Debug, PartialEq, Serialize, serde_derive::Deserialize, NamedType)]
        enum FooBar {
            Foo(i32),
            Bar(String),
        }

        let value = FooBar::Bar("abcd".to_owned());

        let mut buf = Vec::new();
        {
            let mut ser = super::to_writer(&mut buf);
            ser.add_enum_mapping::<FooBarCode, FooBar>(EnumEncoding::Type);
            value.serialize(&mut ser).expect("Failed to serialize");
        }

        let mut bytes = buf.as_slice();
        let mut de = crate::serde::de::from_reader(&mut bytes);
        de.add_enum_mapping::<FooBarCode, FooBar>(EnumEncoding::Type);

        let roundtripped = FooBar::deserialize(&mut de).expect("Failed to deserialize");
        assert_eq!(roundtripped, value);
    }
}
