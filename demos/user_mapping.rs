//! Declarative field mapping end to end: renames, aliases, views,
//! write-only fields, unknown-field capture, unwrapped nesting,
//! identity dedup, polymorphic variants and builder-style decoding.
//!
//! Run with `cargo run --example user_mapping`.

use std::rc::Rc;

use anyhow::Result;
use serde_json::{Map, Value};

use json_mapper_rs::mapping::record::{FieldValue, RecordSource, RecordTarget};
use json_mapper_rs::mapping::rule::{FieldRule, RuleTable, UnknownFieldPolicy, Visibility};
use json_mapper_rs::{Draft, EncodeOptions, Mapper, MapperError};

#[derive(Debug)]
struct Address {
    city: String,
    country: String,
}

impl RecordSource for Address {
    fn record_type(&self) -> &'static str {
        "Address"
    }

    fn field(&self, id: &str) -> FieldValue<'_> {
        match id {
            "city" => self.city.as_str().into(),
            "country" => self.country.as_str().into(),
            _ => FieldValue::Absent,
        }
    }
}

impl RecordTarget for Address {
    const RECORD_TYPE: &'static str = "Address";

    fn from_draft(draft: &mut Draft<'_>) -> Result<Self, MapperError> {
        Ok(Address {
            city: draft.require_string("city")?,
            country: draft.require_string("country")?,
        })
    }
}

#[derive(Debug)]
struct User {
    id: i64,
    username: String,
    password: Option<String>,
    email: Option<String>,
    address: Option<Address>,
    extra: Map<String, Value>,
}

impl RecordSource for User {
    fn record_type(&self) -> &'static str {
        "User"
    }

    fn field(&self, id: &str) -> FieldValue<'_> {
        match id {
            "id" => self.id.into(),
            "username" => self.username.as_str().into(),
            "password" => FieldValue::opt(self.password.as_deref()),
            "email" => FieldValue::opt(self.email.as_deref()),
            "address" => match &self.address {
                Some(address) => FieldValue::Nested(address),
                None => FieldValue::Absent,
            },
            _ => FieldValue::Absent,
        }
    }

    fn extra(&self) -> Option<&Map<String, Value>> {
        Some(&self.extra)
    }
}

impl RecordTarget for User {
    const RECORD_TYPE: &'static str = "User";

    fn from_draft(draft: &mut Draft<'_>) -> Result<Self, MapperError> {
        Ok(User {
            id: draft.require_i64("id")?,
            username: draft.require_string("username")?,
            password: draft.take_string("password"),
            email: draft.take_string("email"),
            address: draft.take_record("address")?,
            extra: draft.take_extra(),
        })
    }
}

#[derive(Debug)]
enum Animal {
    Dog { name: String, bark_volume: i64 },
    Cat { name: String, likes_milk: bool },
}

impl RecordSource for Animal {
    fn record_type(&self) -> &'static str {
        match self {
            Animal::Dog { .. } => "Dog",
            Animal::Cat { .. } => "Cat",
        }
    }

    fn field(&self, id: &str) -> FieldValue<'_> {
        match (self, id) {
            (Animal::Dog { name, .. }, "name") => name.as_str().into(),
            (Animal::Dog { bark_volume, .. }, "bark_volume") => (*bark_volume).into(),
            (Animal::Cat { name, .. }, "name") => name.as_str().into(),
            (Animal::Cat { likes_milk, .. }, "likes_milk") => (*likes_milk).into(),
            _ => FieldValue::Absent,
        }
    }
}

impl RecordTarget for Animal {
    const RECORD_TYPE: &'static str = "Animal";

    fn from_draft(draft: &mut Draft<'_>) -> Result<Self, MapperError> {
        match draft.variant_tag() {
            Some("dog") => Ok(Animal::Dog {
                name: draft.require_string("name")?,
                bark_volume: draft.take_i64("bark_volume").unwrap_or(0),
            }),
            Some("cat") => Ok(Animal::Cat {
                name: draft.require_string("name")?,
                likes_milk: draft.take_bool("likes_milk").unwrap_or(false),
            }),
            other => Err(MapperError::UnknownVariant(
                other.unwrap_or("<missing>").to_owned(),
            )),
        }
    }
}

/// Immutable: both fields are required when the draft is finalized.
#[derive(Debug)]
struct Robot {
    id: String,
    model: String,
}

impl RecordTarget for Robot {
    const RECORD_TYPE: &'static str = "Robot";

    fn from_draft(draft: &mut Draft<'_>) -> Result<Self, MapperError> {
        Ok(Robot {
            id: draft.require_string("id")?,
            model: draft.require_string("model")?,
        })
    }
}

struct Team {
    name: String,
    lead: Rc<User>,
    reviewer: Rc<User>,
}

impl RecordSource for Team {
    fn record_type(&self) -> &'static str {
        "Team"
    }

    fn field(&self, id: &str) -> FieldValue<'_> {
        match id {
            "name" => self.name.as_str().into(),
            "lead" => FieldValue::Shared {
                identity: Rc::as_ptr(&self.lead) as usize,
                record: &*self.lead,
            },
            "reviewer" => FieldValue::Shared {
                identity: Rc::as_ptr(&self.reviewer) as usize,
                record: &*self.reviewer,
            },
            _ => FieldValue::Absent,
        }
    }
}

fn build_mapper() -> Result<Mapper, MapperError> {
    Mapper::builder()
        .table(
            RuleTable::builder("User")
                .rule(FieldRule::new("id", "user_id").order(0))
                .rule(FieldRule::new("username", "username").alias("login").order(1))
                .rule(FieldRule::new("email", "email").view("public"))
                .rule(FieldRule::new("password", "password").visibility(Visibility::DecodeOnly))
                .rule(FieldRule::new("address", "address").unwrap("addr_"))
                .unknown_fields(UnknownFieldPolicy::Capture)
                .identity("id")
                .build()?,
        )
        .table(
            RuleTable::builder("Address")
                .rule(FieldRule::new("city", "city"))
                .rule(FieldRule::new("country", "country"))
                .build()?,
        )
        .table(RuleTable::builder("Animal").discriminator("@type").build()?)
        .table(
            RuleTable::builder("Dog")
                .discriminator("@type")
                .rule(FieldRule::new("name", "name"))
                .rule(FieldRule::new("bark_volume", "bark_volume"))
                .build()?,
        )
        .table(
            RuleTable::builder("Cat")
                .discriminator("@type")
                .rule(FieldRule::new("name", "name"))
                .rule(FieldRule::new("likes_milk", "likes_milk"))
                .build()?,
        )
        .table(
            RuleTable::builder("Robot")
                .rule(FieldRule::new("id", "id"))
                .rule(FieldRule::new("model", "model"))
                .unknown_fields(UnknownFieldPolicy::Fail)
                .build()?,
        )
        .table(
            RuleTable::builder("Team")
                .rule(FieldRule::new("name", "name"))
                .rule(FieldRule::new("lead", "lead"))
                .rule(FieldRule::new("reviewer", "reviewer"))
                .build()?,
        )
        .variant("dog", "Dog")
        .variant("cat", "Cat")
        .build()
}

fn main() -> Result<()> {
    env_logger::init();

    let mapper = build_mapper()?;

    let user = User {
        id: 42,
        username: "narayana".to_owned(),
        password: Some("s3cret".to_owned()),
        email: Some("n@example.com".to_owned()),
        address: Some(Address {
            city: "Bangalore".to_owned(),
            country: "India".to_owned(),
        }),
        extra: Map::new(),
    };

    // The password never leaves; the email only appears in the public
    // view; the address flattens under its prefix.
    println!(
        "default view: {}",
        mapper.encode_to_string(&user, &EncodeOptions::new())?
    );
    println!(
        "public view:  {}",
        mapper.encode_to_string(&user, &EncodeOptions::new().view("public"))?
    );

    // Aliases and unknown-field capture on the way in; captured extras
    // ride along on re-encode.
    let decoded: User = mapper.decode_str(
        r#"{"user_id":7,"login":"alpha","addr_city":"Paris","addr_country":"France","department":"R&D"}"#,
    )?;
    println!("decoded:      {decoded:?}");
    println!(
        "re-encoded:   {}",
        mapper.encode_to_string(&decoded, &EncodeOptions::new())?
    );

    // A shared record encodes in full once; the repeat becomes a stub.
    let lead = Rc::new(User {
        id: 42,
        username: "narayana".to_owned(),
        password: None,
        email: None,
        address: None,
        extra: Map::new(),
    });
    let team = Team {
        name: "codec".to_owned(),
        lead: Rc::clone(&lead),
        reviewer: lead,
    };
    println!(
        "shared lead:  {}",
        mapper.encode_to_string(&team, &EncodeOptions::new())?
    );

    // Polymorphic variants carry their tag first.
    let pets = [
        Animal::Dog {
            name: "Rex".to_owned(),
            bark_volume: 9,
        },
        Animal::Cat {
            name: "Misha".to_owned(),
            likes_milk: true,
        },
    ];
    for pet in &pets {
        let text = mapper.encode_to_string(pet, &EncodeOptions::new())?;
        let back: Animal = mapper.decode_str(&text)?;
        println!("pet:          {text} -> {back:?}");
    }

    // Builder-style decoding: required fields are checked at finalize.
    let robot: Robot = mapper.decode_str(r#"{"id":"R2D2","model":"Astromech"}"#)?;
    println!("robot:        {robot:?}");
    if let Err(error) = mapper.decode_str::<Robot>(r#"{"id":"R2D2"}"#) {
        println!("incomplete:   {error}");
    }

    Ok(())
}
