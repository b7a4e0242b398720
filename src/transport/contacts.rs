use serde_json::{Map, Value};

use crate::domain::{AddContactToGroup, ContactId, GroupId, NewContact, NewGroup};

pub fn encode_new_contact_json(request: &NewContact) -> Value {
    let mut body = Map::new();
    body.insert(
        "phone".to_owned(),
        Value::String(request.phone.as_str().to_owned()),
    );
    if let Some(first_name) = request.first_name.as_deref() {
        body.insert("first_name".to_owned(), Value::String(first_name.to_owned()));
    }
    if let Some(last_name) = request.last_name.as_deref() {
        body.insert("last_name".to_owned(), Value::String(last_name.to_owned()));
    }
    if let Some(group) = request.group.as_ref() {
        body.insert(
            GroupId::FIELD.to_owned(),
            Value::String(group.as_str().to_owned()),
        );
    }
    Value::Object(body)
}

pub fn encode_new_group_json(request: &NewGroup) -> Value {
    let mut body = Map::new();
    body.insert(
        NewGroup::FIELD.to_owned(),
        Value::String(request.name().to_owned()),
    );
    Value::Object(body)
}

pub fn encode_add_contact_to_group_json(request: &AddContactToGroup) -> Value {
    let mut body = Map::new();
    body.insert(
        ContactId::FIELD.to_owned(),
        Value::String(request.contact.as_str().to_owned()),
    );
    Value::Object(body)
}
