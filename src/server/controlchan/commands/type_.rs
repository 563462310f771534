//! The RFC 959 Representation Type (`TYPE`) command
//
// The argument specifies the representation type. Only ASCII
// (A) and IMAGE (I) are accepted. Both are transferred as is.

use crate::server::{
    controlchan::{
        Reply, ReplyCode,
        error::ControlChanError,
        handler::{CommandContext, CommandHandler},
    },
    session::DataType,
};
use async_trait::async_trait;

/// The parameter that can be given to the `TYPE` command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TypeParam {
    Ascii,
    Image,
    Ebcdic,
    Local,
}

#[derive(Debug)]
pub struct Type {
    param: TypeParam,
}

impl Type {
    pub fn new(param: TypeParam) -> Self {
        Type { param }
    }
}

#[async_trait]
impl CommandHandler for Type {
    #[tracing_attributes::instrument]
    async fn handle(&self, args: CommandContext) -> Result<Reply, ControlChanError> {
        let data_type = match self.param {
            TypeParam::Ascii => DataType::Ascii,
            TypeParam::Image => DataType::Image,
            TypeParam::Ebcdic | TypeParam::Local => {
                return Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Only TYPE A and TYPE I are supported"));
            }
        };
        args.session.lock().await.data_type = data_type;
        Ok(Reply::new(ReplyCode::CommandOkay, "Type set"))
    }
}
