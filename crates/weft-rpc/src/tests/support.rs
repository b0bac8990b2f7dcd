//! Address book service shared by the dispatch suites.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::{
    CallArgs, ContextKind, ContextObjects, Dispatcher, FieldDescriptor, FromValue,
    HostCapabilities, InjectedContext, IntoValue, MethodBinding, RecordFields, RegistryBuilder,
    RemoteException, ServiceDefinition, ServiceError, ServiceFactory, TypeDescriptor, Value,
    ValueError,
};

pub(crate) const PASSWORD_MESSAGE: &str = "You should really change your password";

/// Caller session supplied by the test host.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) user: String,
}

pub(crate) fn session_for(user: &str) -> ContextObjects {
    ContextObjects::new().with(
        ContextKind::Session,
        Session {
            user: user.to_owned(),
        },
    )
}

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct PasswordExpired(pub(crate) String);

impl RemoteException for PasswordExpired {
    const TAG: &'static str = "PasswordExpired";

    fn from_message(message: String) -> Self {
        Self(message)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct ContactNotFound(pub(crate) String);

impl RemoteException for ContactNotFound {
    const TAG: &'static str = "ContactNotFound";

    fn from_message(message: String) -> Self {
        Self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sort {
    FirstName,
    LastName,
    Email,
}

impl IntoValue for Sort {
    fn into_value(self) -> Value {
        Value::variant(match self {
            Self::FirstName => "FN",
            Self::LastName => "LN",
            Self::Email => "E",
        })
    }
}

impl FromValue for Sort {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value.into_variant()?.as_str() {
            "FN" => Ok(Self::FirstName),
            "LN" => Ok(Self::LastName),
            "E" => Ok(Self::Email),
            other => Err(ValueError::unknown_variant(other, "Sort")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Address {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: Option<String>,
}

impl Address {
    fn new(first_name: &str, last_name: &str, email: Option<&str>) -> Self {
        Self {
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
            email: email.map(str::to_owned),
        }
    }
}

impl IntoValue for Address {
    fn into_value(self) -> Value {
        Value::record([
            ("firstName", self.first_name.into_value()),
            ("lastName", self.last_name.into_value()),
            ("email", self.email.into_value()),
        ])
    }
}

impl FromValue for Address {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        let mut fields: RecordFields = value.into_record()?;
        Ok(Self {
            first_name: fields.take("firstName")?,
            last_name: fields.take("lastName")?,
            email: fields.take("email")?,
        })
    }
}

pub(crate) fn sort_descriptor() -> TypeDescriptor {
    TypeDescriptor::enumeration("Sort", ["FN", "LN", "E"])
}

pub(crate) fn address_descriptor() -> TypeDescriptor {
    TypeDescriptor::record(
        "Address",
        [
            FieldDescriptor::new("firstName", TypeDescriptor::String),
            FieldDescriptor::new("lastName", TypeDescriptor::String),
            FieldDescriptor::new("email", TypeDescriptor::optional(TypeDescriptor::String)),
        ],
    )
}

pub(crate) fn get_address_list() -> MethodBinding {
    MethodBinding::new(
        "getAddressList",
        TypeDescriptor::sequence(address_descriptor()),
    )
    .param(TypeDescriptor::optional(TypeDescriptor::String))
    .param(sort_descriptor())
}

pub(crate) fn login() -> MethodBinding {
    MethodBinding::new("login", TypeDescriptor::Unit).param(TypeDescriptor::String)
}

pub(crate) fn find_contact() -> MethodBinding {
    MethodBinding::new("findContact", TypeDescriptor::result(address_descriptor()))
        .param(TypeDescriptor::String)
}

pub(crate) fn export_contacts() -> MethodBinding {
    MethodBinding::new("exportContacts", TypeDescriptor::String)
}

pub(crate) fn who_am_i() -> MethodBinding {
    MethodBinding::new("whoAmI", TypeDescriptor::String)
}

pub(crate) fn instance_number() -> MethodBinding {
    MethodBinding::new("instanceNumber", TypeDescriptor::Long)
}

pub(crate) fn crash() -> MethodBinding {
    MethodBinding::new("crash", TypeDescriptor::Unit)
}

fn sample_addresses() -> Vec<Address> {
    vec![
        Address::new("Grace", "Hopper", Some("grace@navy.example")),
        Address::new("Ada", "Lovelace", None),
        Address::new("Alan", "Turing", Some("alan@bletchley.example")),
    ]
}

/// One instance per call.
pub(crate) struct AddressBook {
    user: String,
    instance: usize,
    addresses: Arc<Vec<Address>>,
}

impl AddressBook {
    fn list(&self, search: Option<&str>, sort: Sort) -> Vec<Address> {
        let mut matches: Vec<Address> = self
            .addresses
            .iter()
            .filter(|address| {
                search.is_none_or(|term| {
                    address.first_name.contains(term) || address.last_name.contains(term)
                })
            })
            .cloned()
            .collect();
        match sort {
            Sort::FirstName => matches.sort_by(|a, b| a.first_name.cmp(&b.first_name)),
            Sort::LastName => matches.sort_by(|a, b| a.last_name.cmp(&b.last_name)),
            Sort::Email => matches.sort_by(|a, b| a.email.cmp(&b.email)),
        }
        matches
    }

    fn find(&self, name: &str) -> Option<Address> {
        self.addresses
            .iter()
            .find(|address| address.first_name == name)
            .cloned()
    }
}

pub(crate) struct AddressBookFactory {
    addresses: Arc<Vec<Address>>,
    created: Arc<AtomicUsize>,
}

impl AddressBookFactory {
    pub(crate) fn new(created: Arc<AtomicUsize>) -> Self {
        Self {
            addresses: Arc::new(sample_addresses()),
            created,
        }
    }
}

impl ServiceFactory for AddressBookFactory {
    type Service = AddressBook;

    fn context_kinds(&self) -> &[ContextKind] {
        &[ContextKind::Session]
    }

    fn create(&self, context: &InjectedContext) -> Result<AddressBook, ServiceError> {
        let session = context
            .get::<Session>(ContextKind::Session)
            .map_err(ServiceError::unmarked)?;
        let instance = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AddressBook {
            user: session.user.clone(),
            instance,
            addresses: Arc::clone(&self.addresses),
        })
    }
}

pub(crate) fn address_book(created: Arc<AtomicUsize>) -> ServiceDefinition<AddressBookFactory> {
    ServiceDefinition::new("AddressBook", AddressBookFactory::new(created))
        .method(get_address_list(), |book: Arc<AddressBook>, mut args: CallArgs| async move {
            let search: Option<String> = args.take()?;
            let sort: Sort = args.take()?;
            Ok::<_, ServiceError>(book.list(search.as_deref(), sort))
        })
        .method(login(), |_book, mut args: CallArgs| async move {
            let _user: String = args.take()?;
            Err::<(), _>(ServiceError::raise(PasswordExpired(
                PASSWORD_MESSAGE.to_owned(),
            )))
        })
        .method(find_contact(), |book: Arc<AddressBook>, mut args: CallArgs| async move {
            let name: String = args.take()?;
            book.find(&name).ok_or_else(|| {
                ServiceError::raise(ContactNotFound(format!("no contact named {name}")))
            })
        })
        .method(export_contacts(), |_book, _args| async {
            let cause = anyhow::anyhow!("disk quota exceeded on /var/export");
            Err::<String, _>(ServiceError::Unmarked(
                cause.context("could not export contacts"),
            ))
        })
        .method(who_am_i(), |book: Arc<AddressBook>, _args| async move {
            Ok(book.user.clone())
        })
        .method(instance_number(), |book: Arc<AddressBook>, _args| async move {
            i64::try_from(book.instance).map_err(ServiceError::unmarked)
        })
        .method(crash(), |_book, _args| async { corrupted_index() })
}

fn corrupted_index() -> Result<(), ServiceError> {
    panic!("address index corrupted")
}

/// Builds a registry holding only the address book.
pub(crate) fn address_book_builder(created: Arc<AtomicUsize>) -> RegistryBuilder {
    let mut builder = RegistryBuilder::new("/rpc/", HostCapabilities::all());
    builder
        .register_error::<PasswordExpired>()
        .expect("register PasswordExpired");
    builder
        .register_error::<ContactNotFound>()
        .expect("register ContactNotFound");
    builder
        .register(address_book(created))
        .expect("register address book");
    builder
}

pub(crate) fn address_book_dispatcher() -> Dispatcher {
    Dispatcher::new(address_book_builder(Arc::new(AtomicUsize::new(0))).build())
}
